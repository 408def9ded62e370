use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::{
    changes::{ChangeOp, UnalignedDependency, UnalignedReason},
    model::project::{Coordinate, DependencyGraph, Exclusion, Module, ModuleId, Project},
    policy::OverridePolicy,
    resolver::VersionOracle,
    version::{should_upgrade, VersionComparator},
};

/// Every coordinate declared directly by some module of the project, plus the
/// modules themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependencies {
    coordinates: BTreeSet<Coordinate>,
}

impl DeclaredDependencies {
    pub(crate) fn from_project(project: &Project) -> Self {
        let modules = project
            .modules()
            .map(|(_, module)| Coordinate::new(&module.group_id, &module.artifact_id));
        let dependencies = project
            .modules()
            .flat_map(|(_, module)| module.dependencies.iter())
            .map(|dependency| dependency.coordinate.clone());
        DeclaredDependencies {
            coordinates: modules.chain(dependencies).collect(),
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.coordinates.contains(coordinate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitiveCandidate {
    pub coordinate: Coordinate,
    /// Highest version seen across the visited graphs.
    pub version: String,
    /// Union of the exclusions of every occurrence.
    pub exclusions: BTreeSet<Exclusion>,
}

/// Collects transitive-only dependencies from the graphs of each module.
pub struct TransitiveDiscovery<'a> {
    project: &'a Project,
    policy: &'a OverridePolicy,
    comparator: &'a dyn VersionComparator,
    declared: &'a DeclaredDependencies,
    candidates: BTreeMap<Coordinate, TransitiveCandidate>,
}

impl<'a> TransitiveDiscovery<'a> {
    pub fn new(
        project: &'a Project,
        policy: &'a OverridePolicy,
        comparator: &'a dyn VersionComparator,
        declared: &'a DeclaredDependencies,
    ) -> Self {
        TransitiveDiscovery {
            project,
            policy,
            comparator,
            declared,
            candidates: BTreeMap::new(),
        }
    }

    pub fn visit(&mut self, module: &Module, graph: &DependencyGraph) {
        debug!("Collecting transitive dependencies of {module}");
        for node in graph.nodes() {
            let coordinate = &node.artifact.coordinate;
            let version = &node.artifact.version;
            if self.project.is_project_artifact(coordinate)
                || self.declared.contains(coordinate)
                || self.policy.is_scope_ignored(node.effective_scope())
                || self.policy.is_stream_ignored(coordinate)
            {
                trace!("Skipping {} in the graph of {module}", node.artifact);
                continue;
            }

            match self.candidates.entry(coordinate.clone()) {
                Entry::Vacant(entry) => {
                    trace!("Found transitive dependency {}", node.artifact);
                    entry.insert(TransitiveCandidate {
                        coordinate: coordinate.clone(),
                        version: version.clone(),
                        exclusions: node.exclusions.clone(),
                    });
                }
                Entry::Occupied(mut entry) => {
                    let candidate = entry.get_mut();
                    if self.comparator.compare(version, &candidate.version).is_gt() {
                        debug!(
                            "Conflict for {coordinate}: keeping {version} over {}",
                            candidate.version
                        );
                        candidate.version = version.clone();
                    }
                    candidate
                        .exclusions
                        .extend(node.exclusions.iter().cloned());
                }
            }
        }
    }

    pub fn finish(self) -> TransitiveCandidates<'a> {
        TransitiveCandidates {
            root: self.project.root(),
            comparator: self.comparator,
            candidates: self.candidates.into_values().collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TransitiveOutcome {
    pub injections: Vec<ChangeOp>,
    pub not_covered: BTreeSet<Coordinate>,
    pub unaligned: Vec<UnalignedDependency>,
}

/// Deduplicated candidates, ordered by coordinate, ready to be aligned.
pub struct TransitiveCandidates<'a> {
    root: ModuleId,
    comparator: &'a dyn VersionComparator,
    candidates: Vec<TransitiveCandidate>,
}

impl<'a> TransitiveCandidates<'a> {
    pub fn candidates(&self) -> &[TransitiveCandidate] {
        &self.candidates
    }

    /// Injects a managed dependency in the execution root for every candidate
    /// the channel moves.
    pub fn emit(self, oracle: &dyn VersionOracle, do_not_downgrade: bool) -> TransitiveOutcome {
        let mut outcome = TransitiveOutcome::default();
        for candidate in self.candidates {
            let Some(target) = oracle.resolve(&candidate.coordinate, &candidate.version) else {
                outcome.not_covered.insert(candidate.coordinate);
                continue;
            };
            if should_upgrade(self.comparator, &candidate.version, &target, do_not_downgrade) {
                debug!(
                    "Injecting managed dependency {}:{target} for transitive {}",
                    candidate.coordinate, candidate.version
                );
                outcome.injections.push(ChangeOp::InjectManagedDependency {
                    module: self.root,
                    coordinate: candidate.coordinate,
                    version: target,
                    exclusions: candidate.exclusions,
                    original_version: candidate.version,
                });
            } else if self.comparator.compare(&candidate.version, &target).is_ne() {
                outcome.unaligned.push(UnalignedDependency {
                    module: self.root,
                    coordinate: candidate.coordinate,
                    current_version: candidate.version,
                    channel_version: target,
                    reason: UnalignedReason::DowngradeRefused,
                });
            }
        }
        outcome
    }
}
