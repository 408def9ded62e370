use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    model::project::{ArtifactVersion, ExternalParent},
    property::{property_reference, PropertyError, MAX_PROPERTY_DEPTH},
};

use super::ExternalPropertyResolver;

/// Parents outside of the project, known from the project descriptor.
#[derive(Debug, Clone, Default)]
pub struct ExternalParents {
    parents: HashMap<ArtifactVersion, ExternalParent>,
}

impl ExternalParents {
    pub fn new(parents: Vec<ExternalParent>) -> Self {
        ExternalParents {
            parents: parents
                .into_iter()
                .map(|parent| (parent.artifact.clone(), parent))
                .collect(),
        }
    }
}

impl ExternalPropertyResolver for ExternalParents {
    fn resolve(
        &self,
        parent: &ArtifactVersion,
        name: &str,
    ) -> Result<Option<String>, PropertyError> {
        let mut current = parent.clone();
        let mut name = name.to_owned();
        let mut seen = HashSet::new();

        for _ in 0..MAX_PROPERTY_DEPTH {
            if !seen.insert((current.clone(), name.clone())) {
                return Err(PropertyError::Cycle(name));
            }
            let Some(definition) = self.parents.get(&current) else {
                debug!("External parent {current} is unknown, property {name} is not defined");
                return Ok(None);
            };
            match definition.properties.get(&name) {
                Some(value) => match property_reference(value) {
                    Some(inner) => name = inner.to_owned(),
                    None => return Ok(Some(value.clone())),
                },
                None => match &definition.parent {
                    Some(parent) => current = parent.clone(),
                    None => return Ok(None),
                },
            }
        }

        Err(PropertyError::TooDeep(name))
    }
}
