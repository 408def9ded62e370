use std::path::{Path, PathBuf};

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::model::ParseError;

/// A snapshot of concrete stream versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub streams: Vec<Stream>,
}

/// Version of a group/artifact stream. `artifact_id` may be `*` to cover a whole group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Stream {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Stream {
        Stream {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.artifact_id == "*"
    }
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Manifest, ParseError> {
        debug!("Attempting to read manifest from {}", path.display());
        let manifest = Manifest::from_toml_str(&std::fs::read_to_string(path)?);
        if let Err(err) = &manifest {
            error!("Could not read manifest {} due to err {err}", path.display())
        }
        manifest
    }

    pub fn from_toml_str(data: &str) -> Result<Manifest, ParseError> {
        Ok(toml::from_str::<Manifest>(data)?)
    }
}

/// Where a channel takes its manifest from, as written in the channel file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestReference {
    pub path: Option<PathBuf>,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelDescriptor {
    pub name: Option<String>,
    #[serde(default)]
    pub manifest: ManifestReference,
}

impl ChannelDescriptor {
    pub fn from_file(path: &Path) -> Result<ChannelDescriptor, ParseError> {
        debug!("Attempting to read channel from {}", path.display());
        ChannelDescriptor::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml_str(data: &str) -> Result<ChannelDescriptor, ParseError> {
        Ok(toml::from_str::<ChannelDescriptor>(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_manifest() {
        let str = r#"
            name = "acme-manifest"
            [[streams]]
            group_id = "io.netty"
            artifact_id = "*"
            version = "4.1.100.Final"
            [[streams]]
            group_id = "junit"
            artifact_id = "junit"
            version = "4.13.2"
        "#;
        assert_eq!(
            Manifest::from_toml_str(str).unwrap(),
            Manifest {
                name: Some("acme-manifest".to_owned()),
                streams: vec![
                    Stream::new("io.netty", "*", "4.1.100.Final"),
                    Stream::new("junit", "junit", "4.13.2"),
                ],
            }
        );
    }

    #[test]
    fn load_manifest_with_missing_version() {
        let str = r#"
            [[streams]]
            group_id = "junit"
            artifact_id = "junit"
        "#;
        assert!(Manifest::from_toml_str(str).is_err());
    }

    #[test]
    fn load_channel() {
        let str = r#"
            name = "acme"
            [manifest]
            group_id = "org.acme"
            artifact_id = "acme-manifest"
        "#;
        assert_eq!(
            ChannelDescriptor::from_toml_str(str).unwrap(),
            ChannelDescriptor {
                name: Some("acme".to_owned()),
                manifest: ManifestReference {
                    path: None,
                    group_id: Some("org.acme".to_owned()),
                    artifact_id: Some("acme-manifest".to_owned()),
                    version: None,
                },
            }
        );
    }
}
