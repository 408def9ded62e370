use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, info, warn};

use crate::{
    changes::{ChangeOp, ChangeSet, Diagnostic, UnalignedDependency, UnalignedReason},
    config::AlignOptions,
    model::project::{Coordinate, Dependency, ModuleId, Project},
    policy::OverridePolicy,
    property::{property_reference, PropertyError, PropertyRef, PropertyResolver, ResolvedProperty},
    resolver::{Collaborators, VersionOracle},
    transitive::DeclaredDependencies,
    version::{should_upgrade, VersionComparator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOrigin {
    /// Chosen while aligning a dependency with the channel.
    Channel,
    /// Set by an explicit property or dependency override. Final.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedProperty {
    pub value: String,
    pub origin: LockOrigin,
}

/// The value committed to every property touched so far in the run. The first
/// lock of a property wins; later locks of the same property are no-ops.
#[derive(Debug, Default)]
pub struct LockedProperties {
    locks: HashMap<PropertyRef, LockedProperty>,
}

impl LockedProperties {
    pub fn get(&self, reference: &PropertyRef) -> Option<&LockedProperty> {
        self.locks.get(reference)
    }

    /// Returns the lock that ends up committed for `reference`.
    pub fn lock(
        &mut self,
        reference: PropertyRef,
        value: impl Into<String>,
        origin: LockOrigin,
    ) -> &LockedProperty {
        self.locks.entry(reference).or_insert_with(|| LockedProperty {
            value: value.into(),
            origin,
        })
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[derive(Debug)]
pub struct EngineOutcome {
    pub changes: ChangeSet,
    pub not_covered: BTreeSet<Coordinate>,
    pub unaligned: Vec<UnalignedDependency>,
    pub diagnostics: Vec<Diagnostic>,
    pub declared: DeclaredDependencies,
}

/// Decides the changes for the declared dependencies of every module.
pub struct VersionDecisionEngine<'a> {
    project: &'a Project,
    policy: &'a OverridePolicy,
    options: &'a AlignOptions,
    oracle: &'a dyn VersionOracle,
    comparator: &'a dyn VersionComparator,
    properties: PropertyResolver<'a>,
    locks: LockedProperties,
    overridden: HashSet<(ModuleId, Coordinate)>,
    changes: ChangeSet,
    not_covered: BTreeSet<Coordinate>,
    unaligned: Vec<UnalignedDependency>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> VersionDecisionEngine<'a> {
    pub fn new(
        project: &'a Project,
        policy: &'a OverridePolicy,
        collaborators: Collaborators<'a>,
        options: &'a AlignOptions,
    ) -> Self {
        VersionDecisionEngine {
            project,
            policy,
            options,
            oracle: collaborators.oracle,
            comparator: collaborators.comparator,
            properties: PropertyResolver::new(project, collaborators.external),
            locks: LockedProperties::default(),
            overridden: HashSet::new(),
            changes: ChangeSet::new(),
            not_covered: BTreeSet::new(),
            unaligned: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Applies the hard overrides, then aligns every module in project order.
    pub fn run(mut self) -> EngineOutcome {
        let project = self.project;
        self.apply_hard_overrides();
        for (id, module) in project.modules() {
            if self.policy.is_module_ignored(module) {
                info!("Skipping ignored module {module}");
                continue;
            }
            self.process_module(id);
        }
        self.finish()
    }

    fn finish(self) -> EngineOutcome {
        debug!("Locked {} properties", self.locks.len());
        EngineOutcome {
            changes: self.changes,
            not_covered: self.not_covered,
            unaligned: self.unaligned,
            diagnostics: self.diagnostics,
            declared: DeclaredDependencies::from_project(self.project),
        }
    }

    /// Hard overrides run for the whole project before any channel decision, so
    /// that their locks are in place whichever module reaches a property first.
    fn apply_hard_overrides(&mut self) {
        let project = self.project;
        let policy = self.policy;
        for (id, module) in project.modules() {
            if policy.is_module_ignored(module) {
                continue;
            }
            for (name, current) in &module.properties {
                let Some(value) = policy.hard_property_override(name) else {
                    continue;
                };
                let reference = PropertyRef::in_module(id, name);
                if self.locks.get(&reference).is_some() {
                    continue;
                }
                self.locks.lock(reference, value, LockOrigin::Hard);
                if current != value {
                    info!("Overriding property {name} of {module} to {value}");
                    self.changes.push(ChangeOp::SetProperty {
                        module: id,
                        name: name.to_owned(),
                        value: value.to_owned(),
                    });
                }
            }
            for dependency in &module.dependencies {
                self.apply_dependency_override(id, dependency);
            }
        }
    }

    fn apply_dependency_override(&mut self, id: ModuleId, dependency: &Dependency) {
        let policy = self.policy;
        let coordinate = &dependency.coordinate;
        let Some(version) = policy.hard_dependency_override(coordinate) else {
            return;
        };
        let Some(current) = dependency.version.as_deref() else {
            return;
        };
        if self.project.is_project_artifact(coordinate)
            || !self.overridden.insert((id, coordinate.clone()))
        {
            return;
        }

        let resolved = match property_reference(current) {
            Some(name) if !self.options.inline_versions => {
                match self.properties.resolve(id, name) {
                    Ok(resolved) => resolved,
                    Err(err) => {
                        self.warn(id, coordinate, Some(name), err.to_string());
                        None
                    }
                }
            }
            _ => None,
        };

        if let Some(resolved) = &resolved {
            if !resolved.reference.is_external() {
                match self.locks.get(&resolved.reference) {
                    None => {
                        info!(
                            "Overriding {coordinate} to {version} through property {}",
                            resolved.reference.name
                        );
                        self.locks
                            .lock(resolved.reference.clone(), version, LockOrigin::Hard);
                        if resolved.value != version {
                            self.changes.push(ChangeOp::SetProperty {
                                module: resolved.target,
                                name: resolved.reference.name.clone(),
                                value: version.to_owned(),
                            });
                        }
                        return;
                    }
                    Some(lock) if lock.value == version => return,
                    Some(_) => {}
                }
            }
        }

        let effective = resolved
            .as_ref()
            .map_or(current, |resolved| resolved.value.as_str());
        if effective != version {
            info!("Overriding {coordinate} inline to {version}");
            self.changes.push(ChangeOp::OverrideInlineVersion {
                module: id,
                coordinate: coordinate.clone(),
                old_version: current.to_owned(),
                new_version: version.to_owned(),
            });
        }
    }

    fn process_module(&mut self, id: ModuleId) {
        let project = self.project;
        let module = project.module(id);
        info!("Aligning module {module}");

        let mut seen = HashSet::new();
        for dependency in &module.dependencies {
            if !seen.insert((&dependency.coordinate, dependency.location)) {
                debug!(
                    "{} is declared more than once in {module}, processing it once",
                    dependency.coordinate
                );
                continue;
            }
            self.process_dependency(id, dependency);
        }
    }

    fn process_dependency(&mut self, id: ModuleId, dependency: &Dependency) {
        let coordinate = &dependency.coordinate;
        let Some(raw_version) = dependency.version.as_deref() else {
            debug!("{coordinate} has no version of its own, skipping");
            return;
        };
        if self.project.is_project_artifact(coordinate) {
            debug!("{coordinate} is a module of the project, skipping");
            return;
        }

        let reference = property_reference(raw_version);
        let resolution = reference.map(|name| self.properties.resolve(id, name));
        let current = match &resolution {
            None => Some(raw_version),
            Some(Ok(Some(resolved))) => Some(resolved.value.as_str()),
            Some(_) => None,
        };

        if self.overridden.contains(&(id, coordinate.clone())) {
            debug!("{coordinate} was overridden explicitly, skipping");
            return;
        }

        if let Some(reason) = self
            .policy
            .is_ignored(coordinate, dependency.effective_scope())
        {
            debug!("{coordinate} is left alone: {reason}");
            if let Some(current) = current {
                if let Some(target) = self.oracle.resolve(coordinate, current) {
                    self.report_unaligned(id, coordinate, current, &target, reason);
                }
            }
            return;
        }

        let Some(target) = self
            .oracle
            .resolve(coordinate, current.unwrap_or(raw_version))
        else {
            debug!("{coordinate} is not covered by the channel");
            self.not_covered.insert(coordinate.clone());
            return;
        };

        match reference {
            Some(name) if !self.options.inline_versions => {
                self.align_property(id, coordinate, raw_version, name, resolution, target)
            }
            Some(name) => match resolution {
                Some(Ok(Some(resolved))) => {
                    self.align_inline(id, coordinate, raw_version, &resolved.value, &target)
                }
                other => self.warn_unresolved(id, coordinate, name, other),
            },
            None => self.align_inline(id, coordinate, raw_version, raw_version, &target),
        }
    }

    fn align_inline(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        raw_version: &str,
        current: &str,
        target: &str,
    ) {
        if should_upgrade(
            self.comparator,
            current,
            target,
            self.options.do_not_downgrade,
        ) {
            info!("Aligning {coordinate} inline: {current} -> {target}");
            self.changes.push(ChangeOp::OverrideInlineVersion {
                module: id,
                coordinate: coordinate.clone(),
                old_version: raw_version.to_owned(),
                new_version: target.to_owned(),
            });
        } else {
            self.report_unaligned(
                id,
                coordinate,
                current,
                target,
                UnalignedReason::DowngradeRefused,
            );
        }
    }

    fn align_property(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        raw_version: &str,
        name: &str,
        resolution: Option<Result<Option<ResolvedProperty>, PropertyError>>,
        target: String,
    ) {
        if self.policy.is_property_ignored(name) {
            if let Some(Ok(Some(resolved))) = &resolution {
                self.report_unaligned(
                    id,
                    coordinate,
                    &resolved.value,
                    &target,
                    UnalignedReason::IgnoredProperty,
                );
            }
            return;
        }

        let resolved = match resolution {
            Some(Ok(Some(resolved))) => resolved,
            other => return self.warn_unresolved(id, coordinate, name, other),
        };

        if resolved.reference.name != name
            && self.policy.is_property_ignored(&resolved.reference.name)
        {
            self.report_unaligned(
                id,
                coordinate,
                &resolved.value,
                &target,
                UnalignedReason::IgnoredProperty,
            );
            return;
        }

        match self.locks.get(&resolved.reference).cloned() {
            Some(LockedProperty {
                value,
                origin: LockOrigin::Hard,
            }) => {
                debug!(
                    "Property {} is overridden explicitly, leaving {coordinate} alone",
                    resolved.reference
                );
                self.report_unaligned(id, coordinate, &value, &target, UnalignedReason::HardOverride);
            }
            Some(LockedProperty { value: locked, .. })
                if self.comparator.compare(&locked, &target).is_eq() =>
            {
                debug!(
                    "Property {} is already aligned to {target} for {coordinate}",
                    resolved.reference
                );
            }
            Some(LockedProperty { value: locked, .. }) => {
                if should_upgrade(
                    self.comparator,
                    &locked,
                    &target,
                    self.options.do_not_downgrade,
                ) {
                    info!(
                        "Property {} is locked to {locked}, aligning {coordinate} inline to {target}",
                        resolved.reference
                    );
                    self.changes.push(ChangeOp::OverrideInlineVersion {
                        module: id,
                        coordinate: coordinate.clone(),
                        old_version: raw_version.to_owned(),
                        new_version: target,
                    });
                } else {
                    self.report_unaligned(
                        id,
                        coordinate,
                        &locked,
                        &target,
                        UnalignedReason::DowngradeRefused,
                    );
                }
            }
            None => self.lock_property(id, coordinate, resolved, target),
        }
    }

    fn lock_property(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        resolved: ResolvedProperty,
        target: String,
    ) {
        let ResolvedProperty {
            reference,
            value: current,
            target: module,
        } = resolved;

        if !should_upgrade(
            self.comparator,
            &current,
            &target,
            self.options.do_not_downgrade,
        ) {
            self.report_unaligned(
                id,
                coordinate,
                &current,
                &target,
                UnalignedReason::DowngradeRefused,
            );
            self.locks.lock(reference, current, LockOrigin::Channel);
            return;
        }

        let op = if !reference.is_external() {
            ChangeOp::SetProperty {
                module,
                name: reference.name.clone(),
                value: target.clone(),
            }
        } else if self.options.inject_external_properties {
            ChangeOp::InjectProperty {
                module,
                name: reference.name.clone(),
                value: target.clone(),
            }
        } else {
            self.warn(
                id,
                coordinate,
                Some(reference.name.as_str()),
                "property is only defined in an external parent and injection is disabled",
            );
            self.report_unaligned(
                id,
                coordinate,
                &current,
                &target,
                UnalignedReason::ExternalPropertyNotInjected,
            );
            self.locks.lock(reference, current, LockOrigin::Channel);
            return;
        };

        info!("Aligning {coordinate}: {op}");
        self.locks.lock(reference, target, LockOrigin::Channel);
        self.changes.push(op);
    }

    fn warn_unresolved(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        name: &str,
        resolution: Option<Result<Option<ResolvedProperty>, PropertyError>>,
    ) {
        let message = match resolution {
            Some(Err(err)) => err.to_string(),
            _ => "property is not defined in the project or its parents".to_owned(),
        };
        self.warn(id, coordinate, Some(name), message);
    }

    fn warn(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        property: Option<&str>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            module: id,
            coordinate: coordinate.clone(),
            property: property.map(str::to_owned),
            message: message.into(),
        };
        warn!("Leaving {diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn report_unaligned(
        &mut self,
        id: ModuleId,
        coordinate: &Coordinate,
        current: &str,
        target: &str,
        reason: UnalignedReason,
    ) {
        if self.comparator.compare(current, target).is_eq() {
            return;
        }
        debug!("{coordinate} stays at {current} instead of {target}: {reason}");
        self.unaligned.push(UnalignedDependency {
            module: id,
            coordinate: coordinate.clone(),
            current_version: current.to_owned(),
            channel_version: target.to_owned(),
            reason,
        });
    }
}
