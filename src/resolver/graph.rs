use std::collections::HashMap;

use log::debug;

use crate::model::project::{descriptor::ProjectDescriptor, ArtifactVersion, DependencyGraph, Module};

use super::GraphBuilder;

/// Serves the dependency graphs recorded in the project descriptor.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphBuilder {
    graphs: HashMap<ArtifactVersion, DependencyGraph>,
}

impl StaticGraphBuilder {
    pub fn from_descriptor(descriptor: &ProjectDescriptor) -> Self {
        let graphs = descriptor
            .graphs
            .iter()
            .map(|(id, graph)| (descriptor.project.module(*id).gav(), graph.clone()))
            .collect();
        StaticGraphBuilder { graphs }
    }
}

impl GraphBuilder for StaticGraphBuilder {
    fn full_dependency_graph(&self, module: &Module) -> anyhow::Result<DependencyGraph> {
        match self.graphs.get(&module.gav()) {
            Some(graph) => Ok(graph.clone()),
            None => {
                debug!("No dependency graph recorded for {module}");
                Ok(DependencyGraph::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_recorded_graph() {
        let descriptor = ProjectDescriptor::from_toml_str(
            r#"
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
            execution_root = true
            [[modules.graph]]
            artifact = "io.netty:netty-buffer:4.1.0"

            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-core"
            version = "1.0.0"
            "#,
        )
        .unwrap();
        let builder = StaticGraphBuilder::from_descriptor(&descriptor);
        let (_, parent) = descriptor.project.modules().next().unwrap();
        let (_, core) = descriptor.project.modules().nth(1).unwrap();

        assert_eq!(builder.full_dependency_graph(parent).unwrap().nodes().count(), 1);
        assert_eq!(builder.full_dependency_graph(core).unwrap(), DependencyGraph::default());
    }
}
