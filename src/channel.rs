use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use home::home_dir;
use log::{debug, info, warn};
use regex_lite::Regex;
use thiserror::Error;

use crate::{
    model::{
        manifest::{ChannelDescriptor, Manifest},
        ParseError,
    },
    version::VersionComparator,
};

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error(
        "A manifest coordinate needs both a group id and an artifact id, got group {group_id:?} and artifact {artifact_id:?}"
    )]
    PartialManifestCoordinate {
        group_id: Option<String>,
        artifact_id: Option<String>,
    },
    #[error("Invalid manifest coordinate component `{0}`")]
    InvalidCoordinate(String),
    #[error("Channel {0} does not reference a manifest")]
    MissingManifest(PathBuf),
    #[error("Manifest {coordinate} not found in local repository {repository}")]
    ManifestNotFound {
        coordinate: String,
        repository: PathBuf,
    },
    #[error("Error while parsing {path}: {error}")]
    Parsing { path: PathBuf, error: ParseError },
    #[error("Could not find home dir. Please define $HOME env variable.")]
    HomeDirNotFound,
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Manifest published as an artifact of the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    /// `None` picks the highest version present in the repository.
    pub version: Option<String>,
}

impl ManifestCoordinate {
    /// Returns `None` when neither group nor artifact is set. Setting only one
    /// of them is an error.
    pub fn from_parts(
        group_id: Option<String>,
        artifact_id: Option<String>,
        version: Option<String>,
    ) -> Result<Option<ManifestCoordinate>, ChannelError> {
        match (group_id, artifact_id) {
            (None, None) => {
                if let Some(version) = version {
                    warn!("Ignoring manifest version {version} given without a manifest coordinate");
                }
                Ok(None)
            }
            (Some(group_id), Some(artifact_id)) => {
                for component in [Some(&group_id), Some(&artifact_id), version.as_ref()]
                    .into_iter()
                    .flatten()
                {
                    validate_component(component)?;
                }
                Ok(Some(ManifestCoordinate {
                    group_id,
                    artifact_id,
                    version,
                }))
            }
            (group_id, artifact_id) => Err(ChannelError::PartialManifestCoordinate {
                group_id,
                artifact_id,
            }),
        }
    }
}

impl Display for ManifestCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        match &self.version {
            Some(version) => write!(f, ":{version}"),
            None => Ok(()),
        }
    }
}

/// Coordinate components end up as path segments, so they may not climb out
/// of the repository.
fn validate_component(component: &str) -> Result<(), ChannelError> {
    let valid = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.+\-]*$")
        .map_or(false, |re| re.is_match(component));
    if valid && !component.contains("..") {
        Ok(())
    } else {
        Err(ChannelError::InvalidCoordinate(component.to_owned()))
    }
}

/// A Maven style repository on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalRepository { root: root.into() }
    }

    /// `$HOME/.m2/repository`.
    pub fn default_location() -> Result<PathBuf, ChannelError> {
        let home = home_dir().ok_or(ChannelError::HomeDirNotFound)?;
        Ok(home.join(".m2").join("repository"))
    }

    fn artifact_dir(&self, group_id: &str, artifact_id: &str) -> PathBuf {
        group_id
            .split('.')
            .fold(self.root.clone(), |path, segment| path.join(segment))
            .join(artifact_id)
    }

    /// `<group as directories>/<artifact>/<version>/<artifact>-<version>-manifest.toml`
    pub fn manifest_path(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        self.artifact_dir(group_id, artifact_id)
            .join(version)
            .join(format!("{artifact_id}-{version}-manifest.toml"))
    }

    /// Highest version of the artifact that has a manifest in the repository.
    pub fn latest_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        comparator: &dyn VersionComparator,
    ) -> Result<Option<String>, ChannelError> {
        let dir = self.artifact_dir(group_id, artifact_id);
        if !dir.is_dir() {
            debug!("No versions of {group_id}:{artifact_id} in {}", dir.display());
            return Ok(None);
        }

        let mut latest: Option<String> = None;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let Ok(version) = entry.file_name().into_string() else {
                continue;
            };
            if !self.manifest_path(group_id, artifact_id, &version).is_file() {
                continue;
            }
            latest = match latest {
                Some(current) if comparator.compare(&current, &version).is_ge() => Some(current),
                _ => Some(version),
            };
        }
        Ok(latest)
    }

    pub fn resolve(
        &self,
        coordinate: &ManifestCoordinate,
        comparator: &dyn VersionComparator,
    ) -> Result<PathBuf, ChannelError> {
        let version = match &coordinate.version {
            Some(version) => Some(version.clone()),
            None => self.latest_version(&coordinate.group_id, &coordinate.artifact_id, comparator)?,
        };
        let path = version
            .map(|version| {
                self.manifest_path(&coordinate.group_id, &coordinate.artifact_id, &version)
            })
            .filter(|path| path.is_file());
        path.ok_or_else(|| ChannelError::ManifestNotFound {
            coordinate: coordinate.to_string(),
            repository: self.root.clone(),
        })
    }
}

/// Loads the manifest of the channel described in `channel_file`. A manifest
/// coordinate given in `manifest_override` replaces the channel's own manifest.
pub fn load_manifest(
    channel_file: &Path,
    manifest_override: Option<&ManifestCoordinate>,
    repository: &LocalRepository,
    comparator: &dyn VersionComparator,
) -> Result<Manifest, ChannelError> {
    let path = match manifest_override {
        Some(coordinate) => {
            info!("Using manifest {coordinate} instead of the channel's own");
            repository.resolve(coordinate, comparator)?
        }
        None => manifest_location(channel_file, repository, comparator)?,
    };

    info!("Loading manifest from {}", path.display());
    Manifest::from_file(&path).map_err(|error| ChannelError::Parsing { path, error })
}

fn manifest_location(
    channel_file: &Path,
    repository: &LocalRepository,
    comparator: &dyn VersionComparator,
) -> Result<PathBuf, ChannelError> {
    let channel = ChannelDescriptor::from_file(channel_file).map_err(|error| {
        ChannelError::Parsing {
            path: channel_file.to_path_buf(),
            error,
        }
    })?;
    if let Some(name) = &channel.name {
        debug!("Read channel {name} from {}", channel_file.display());
    }

    let reference = channel.manifest;
    let coordinate =
        ManifestCoordinate::from_parts(reference.group_id, reference.artifact_id, reference.version)?;
    match (reference.path, coordinate) {
        (Some(path), coordinate) => {
            if let Some(coordinate) = coordinate {
                warn!("Channel sets both a manifest path and {coordinate}, using the path");
            }
            let base = channel_file.parent().unwrap_or_else(|| Path::new(""));
            Ok(base.join(path))
        }
        (None, Some(coordinate)) => repository.resolve(&coordinate, comparator),
        (None, None) => Err(ChannelError::MissingManifest(channel_file.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::version::MavenVersionComparator;

    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
        name = "acme-manifest"
        [[streams]]
        group_id = "io.netty"
        artifact_id = "*"
        version = "4.1.100.Final"
    "#;

    fn publish(repository: &LocalRepository, version: &str) {
        let path = repository.manifest_path("org.acme", "acme-manifest", version);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, MANIFEST.replace("acme-manifest", &format!("acme-manifest-{version}"))).unwrap();
    }

    fn coordinate(version: Option<&str>) -> ManifestCoordinate {
        ManifestCoordinate {
            group_id: "org.acme".to_owned(),
            artifact_id: "acme-manifest".to_owned(),
            version: version.map(str::to_owned),
        }
    }

    #[test]
    fn partial_coordinate_is_an_error() {
        assert!(matches!(
            ManifestCoordinate::from_parts(Some("org.acme".to_owned()), None, None),
            Err(ChannelError::PartialManifestCoordinate { .. })
        ));
        assert!(matches!(
            ManifestCoordinate::from_parts(None, Some("acme-manifest".to_owned()), None),
            Err(ChannelError::PartialManifestCoordinate { .. })
        ));
        assert_eq!(
            ManifestCoordinate::from_parts(None, None, Some("1.0".to_owned())).unwrap(),
            None
        );
        assert!(matches!(
            ManifestCoordinate::from_parts(
                Some("org.acme".to_owned()),
                Some("..".to_owned()),
                None
            ),
            Err(ChannelError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn maven_layout() {
        let repository = LocalRepository::new("/repo");
        assert_eq!(
            repository.manifest_path("org.acme", "acme-manifest", "1.0"),
            PathBuf::from("/repo/org/acme/acme-manifest/1.0/acme-manifest-1.0-manifest.toml")
        );
    }

    #[test]
    fn pick_latest_published_version() {
        let dir = tempfile::tempdir().unwrap();
        let repository = LocalRepository::new(dir.path());
        publish(&repository, "1.9");
        publish(&repository, "1.10");
        fs::create_dir_all(dir.path().join("org/acme/acme-manifest/2.0")).unwrap();

        assert_eq!(
            repository
                .latest_version("org.acme", "acme-manifest", &MavenVersionComparator)
                .unwrap(),
            Some("1.10".to_owned())
        );
        assert_eq!(
            repository
                .latest_version("org.acme", "missing", &MavenVersionComparator)
                .unwrap(),
            None
        );
    }

    #[test]
    fn load_manifest_from_channel_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.toml"), MANIFEST).unwrap();
        let channel = dir.path().join("channel.toml");
        fs::write(&channel, "name = \"acme\"\n[manifest]\npath = \"manifest.toml\"\n").unwrap();

        let manifest = load_manifest(
            &channel,
            None,
            &LocalRepository::new(dir.path().join("repository")),
            &MavenVersionComparator,
        )
        .unwrap();
        assert_eq!(manifest.name.as_deref(), Some("acme-manifest"));
        assert_eq!(manifest.streams.len(), 1);
    }

    #[test]
    fn load_manifest_from_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repository = LocalRepository::new(dir.path().join("repository"));
        publish(&repository, "1.0");
        publish(&repository, "1.1");
        let channel = dir.path().join("channel.toml");
        fs::write(
            &channel,
            "[manifest]\ngroup_id = \"org.acme\"\nartifact_id = \"acme-manifest\"\n",
        )
        .unwrap();

        let latest = load_manifest(&channel, None, &repository, &MavenVersionComparator).unwrap();
        assert_eq!(latest.name.as_deref(), Some("acme-manifest-1.1"));

        let pinned = load_manifest(
            &channel,
            Some(&coordinate(Some("1.0"))),
            &repository,
            &MavenVersionComparator,
        )
        .unwrap();
        assert_eq!(pinned.name.as_deref(), Some("acme-manifest-1.0"));

        assert!(matches!(
            load_manifest(
                &channel,
                Some(&coordinate(Some("3.0"))),
                &repository,
                &MavenVersionComparator
            ),
            Err(ChannelError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn channel_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let channel = dir.path().join("channel.toml");
        fs::write(&channel, "name = \"acme\"\n").unwrap();
        assert!(matches!(
            load_manifest(
                &channel,
                None,
                &LocalRepository::new(dir.path()),
                &MavenVersionComparator
            ),
            Err(ChannelError::MissingManifest(_))
        ));
    }
}
