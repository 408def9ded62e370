use std::collections::HashMap;

use log::{trace, warn};

use crate::model::{manifest::Manifest, project::Coordinate};

use super::VersionOracle;

/// Answers channel lookups from the streams of a manifest. Streams naming an
/// artifact take precedence over `group:*` streams.
#[derive(Debug, Clone, Default)]
pub struct ManifestOracle {
    artifacts: HashMap<(String, String), String>,
    groups: HashMap<String, String>,
}

impl ManifestOracle {
    pub fn new(manifest: &Manifest) -> Self {
        let mut oracle = ManifestOracle::default();
        for stream in &manifest.streams {
            let previous: &String = if stream.is_wildcard() {
                oracle
                    .groups
                    .entry(stream.group_id.clone())
                    .or_insert_with(|| stream.version.clone())
            } else {
                oracle
                    .artifacts
                    .entry((stream.group_id.clone(), stream.artifact_id.clone()))
                    .or_insert_with(|| stream.version.clone())
            };
            if *previous != stream.version {
                warn!(
                    "Stream {}:{} is defined more than once, keeping version {}",
                    stream.group_id, stream.artifact_id, previous
                );
            }
        }
        oracle
    }
}

impl VersionOracle for ManifestOracle {
    fn resolve(&self, coordinate: &Coordinate, current_version: &str) -> Option<String> {
        let version = self
            .artifacts
            .get(&(coordinate.group_id.clone(), coordinate.artifact_id.clone()))
            .or_else(|| self.groups.get(&coordinate.group_id))
            .cloned();
        trace!("Channel version of {coordinate} (currently {current_version}): {version:?}");
        version
    }
}
