mod external;
mod graph;
mod manifest;

pub use external::ExternalParents;
pub use graph::StaticGraphBuilder;
pub use manifest::ManifestOracle;

use crate::{
    model::project::{ArtifactVersion, Coordinate, DependencyGraph, Module},
    property::PropertyError,
    version::VersionComparator,
};

/// Channel lookup. Must answer the same way for the same input during a run.
pub trait VersionOracle {
    /// Returns the channel version of `coordinate`, or `None` when the channel
    /// does not cover it.
    fn resolve(&self, coordinate: &Coordinate, current_version: &str) -> Option<String>;
}

impl<F> VersionOracle for F
where
    F: Fn(&Coordinate, &str) -> Option<String>,
{
    fn resolve(&self, coordinate: &Coordinate, current_version: &str) -> Option<String> {
        self(coordinate, current_version)
    }
}

/// Property lookup in parents living outside of the project.
pub trait ExternalPropertyResolver {
    fn resolve(&self, parent: &ArtifactVersion, name: &str)
        -> Result<Option<String>, PropertyError>;
}

pub trait GraphBuilder {
    fn full_dependency_graph(&self, module: &Module) -> anyhow::Result<DependencyGraph>;
}

/// The capabilities an alignment run consumes.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub oracle: &'a dyn VersionOracle,
    pub external: &'a dyn ExternalPropertyResolver,
    pub graph: &'a dyn GraphBuilder,
    pub comparator: &'a dyn VersionComparator,
}
