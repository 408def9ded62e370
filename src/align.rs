use std::collections::BTreeSet;

use log::{debug, info};
use thiserror::Error;

use crate::{
    changes::{ChangeSet, Diagnostic, UnalignedDependency},
    config::AlignOptions,
    engine::VersionDecisionEngine,
    model::project::{Coordinate, Project},
    policy::OverridePolicy,
    resolver::Collaborators,
    transitive::TransitiveDiscovery,
};

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Could not build the dependency graph of {module}: {error}")]
    Graph {
        module: String,
        error: anyhow::Error,
    },
}

/// Everything decided by one alignment run.
#[derive(Debug, Default)]
pub struct AlignmentReport {
    pub changes: ChangeSet,
    pub not_covered: BTreeSet<Coordinate>,
    pub unaligned: Vec<UnalignedDependency>,
    pub warnings: Vec<Diagnostic>,
}

impl AlignmentReport {
    /// True when nothing would change and nothing was left behind the channel.
    pub fn is_aligned(&self) -> bool {
        self.changes.is_empty() && self.unaligned.is_empty()
    }
}

/// Aligns `project` with the channel behind `collaborators.oracle`.
pub fn align(
    project: &Project,
    collaborators: Collaborators,
    options: &AlignOptions,
) -> Result<AlignmentReport, AlignError> {
    let policy = OverridePolicy::from_options(options);
    let outcome = VersionDecisionEngine::new(project, &policy, collaborators, options).run();
    info!(
        "Decided {} changes for declared dependencies, {} not covered by the channel",
        outcome.changes.len(),
        outcome.not_covered.len()
    );

    let mut report = AlignmentReport {
        changes: outcome.changes,
        not_covered: outcome.not_covered,
        unaligned: outcome.unaligned,
        warnings: outcome.diagnostics,
    };

    if options.inject_transitive_dependencies {
        let mut discovery = TransitiveDiscovery::new(
            project,
            &policy,
            collaborators.comparator,
            &outcome.declared,
        );
        for (_, module) in project.modules() {
            if policy.is_module_ignored(module) {
                continue;
            }
            let graph = collaborators
                .graph
                .full_dependency_graph(module)
                .map_err(|error| AlignError::Graph {
                    module: module.to_string(),
                    error,
                })?;
            discovery.visit(module, &graph);
        }
        let candidates = discovery.finish();
        debug!(
            "Found {} transitive only dependencies",
            candidates.candidates().len()
        );
        let transitive = candidates.emit(collaborators.oracle, options.do_not_downgrade);
        info!(
            "Injecting {} managed dependencies for transitive dependencies",
            transitive.injections.len()
        );
        report.changes.extend(transitive.injections);
        report.not_covered.extend(transitive.not_covered);
        report.unaligned.extend(transitive.unaligned);
    }

    Ok(report)
}
