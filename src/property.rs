use std::{collections::HashSet, fmt::Display};

use log::trace;
use thiserror::Error;

use crate::{
    model::project::{ArtifactVersion, ModuleId, Parent, Project},
    resolver::ExternalPropertyResolver,
};

/// Upper bound on the number of lookups a single property resolution may take.
pub const MAX_PROPERTY_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property `{0}` is part of a reference cycle")]
    Cycle(String),
    #[error("Property `{0}` could not be resolved within {depth} lookups", depth = MAX_PROPERTY_DEPTH)]
    TooDeep(String),
}

/// Returns the referenced name when `value` is exactly one `${name}` reference.
///
/// Composite values such as `${a}-${b}` or `x${a}` are literals.
pub fn property_reference(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix("${")?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['$', '{', '}']) {
        None
    } else {
        Some(inner)
    }
}

/// A property as seen by the lock map.
///
/// An in-project property is keyed by the module defining it. A property
/// inherited from a parent outside of the project is keyed by the boundary
/// module whose parent is external, since each boundary gets its own injection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct PropertyRef {
    pub module: ModuleId,
    pub name: String,
    pub external: bool,
}

impl PropertyRef {
    pub fn in_module(module: ModuleId, name: impl Into<String>) -> PropertyRef {
        PropertyRef {
            module,
            name: name.into(),
            external: false,
        }
    }

    pub fn external(boundary: ModuleId, name: impl Into<String>) -> PropertyRef {
        PropertyRef {
            module: boundary,
            name: name.into(),
            external: true,
        }
    }

    pub fn is_external(&self) -> bool {
        self.external
    }
}

impl Display for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.external {
            write!(f, "{} (external, below module #{})", self.name, self.module.index())
        } else {
            write!(f, "{} (module #{})", self.name, self.module.index())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub reference: PropertyRef,
    /// Final literal value.
    pub value: String,
    /// Module a change to this property is written to: the defining module, or
    /// for external properties the project module whose parent is external.
    pub target: ModuleId,
}

pub struct PropertyResolver<'a> {
    project: &'a Project,
    external: &'a dyn ExternalPropertyResolver,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(project: &'a Project, external: &'a dyn ExternalPropertyResolver) -> Self {
        PropertyResolver { project, external }
    }

    /// Resolves `name` as seen from `module`.
    ///
    /// References are followed on the module defining them; undefined names
    /// escalate to the in-project parent. Once the project is exhausted, the
    /// last name looked up is searched in the external parent chain.
    pub fn resolve(
        &self,
        module: ModuleId,
        name: &str,
    ) -> Result<Option<ResolvedProperty>, PropertyError> {
        let mut current = module;
        let mut name = name.to_owned();
        let mut seen = HashSet::new();

        for _ in 0..MAX_PROPERTY_DEPTH {
            if !seen.insert((current, name.clone())) {
                return Err(PropertyError::Cycle(name));
            }
            let definition = self.project.module(current);
            match definition.properties.get(&name) {
                Some(value) => match property_reference(value) {
                    Some(inner) => {
                        trace!("Property {name} of {definition} references {inner}");
                        name = inner.to_owned();
                    }
                    None => {
                        return Ok(Some(ResolvedProperty {
                            reference: PropertyRef::in_module(current, name),
                            value: value.clone(),
                            target: current,
                        }))
                    }
                },
                None => match &definition.parent {
                    Some(Parent::Project(parent)) => {
                        trace!("Property {name} not defined in {definition}, trying its parent");
                        current = *parent;
                    }
                    Some(Parent::External(parent)) => {
                        return self.resolve_external(current, parent, name)
                    }
                    None => return Ok(None),
                },
            }
        }

        Err(PropertyError::TooDeep(name))
    }

    fn resolve_external(
        &self,
        boundary: ModuleId,
        parent: &ArtifactVersion,
        name: String,
    ) -> Result<Option<ResolvedProperty>, PropertyError> {
        trace!("Looking up property {name} in external parent {parent}");
        Ok(self
            .external
            .resolve(parent, &name)?
            .map(|value| ResolvedProperty {
                reference: PropertyRef::external(boundary, name),
                value,
                target: boundary,
            }))
    }
}
