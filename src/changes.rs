use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::model::project::{Coordinate, Exclusion, ModuleId};

/// A single intended change to the project, handed to a rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    SetProperty {
        module: ModuleId,
        name: String,
        value: String,
    },
    /// Defines locally a property that was inherited from an external parent.
    InjectProperty {
        module: ModuleId,
        name: String,
        value: String,
    },
    OverrideInlineVersion {
        module: ModuleId,
        coordinate: Coordinate,
        old_version: String,
        new_version: String,
    },
    InjectManagedDependency {
        module: ModuleId,
        coordinate: Coordinate,
        version: String,
        exclusions: BTreeSet<Exclusion>,
        original_version: String,
    },
}

impl ChangeOp {
    pub fn module(&self) -> ModuleId {
        match self {
            ChangeOp::SetProperty { module, .. }
            | ChangeOp::InjectProperty { module, .. }
            | ChangeOp::OverrideInlineVersion { module, .. }
            | ChangeOp::InjectManagedDependency { module, .. } => *module,
        }
    }
}

impl Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOp::SetProperty { name, value, .. } => write!(f, "set property {name} to {value}"),
            ChangeOp::InjectProperty { name, value, .. } => {
                write!(f, "inject property {name} = {value}")
            }
            ChangeOp::OverrideInlineVersion {
                coordinate,
                old_version,
                new_version,
                ..
            } => write!(f, "override {coordinate} {old_version} -> {new_version}"),
            ChangeOp::InjectManagedDependency {
                coordinate,
                version,
                original_version,
                ..
            } => write!(
                f,
                "inject managed dependency {coordinate}:{version} (was {original_version})"
            ),
        }
    }
}

/// Ordered list of changes. Exact duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    ops: Vec<ChangeOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    /// Appends `op` unless it was already recorded. Returns whether it was added.
    pub fn push(&mut self, op: ChangeOp) -> bool {
        if self.ops.contains(&op) {
            false
        } else {
            self.ops.push(op);
            true
        }
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = ChangeOp>) {
        for op in ops {
            self.push(op);
        }
    }

    pub fn ops(&self) -> &[ChangeOp] {
        &self.ops
    }

    pub fn for_module(&self, module: ModuleId) -> impl Iterator<Item = &ChangeOp> {
        self.ops.iter().filter(move |op| op.module() == module)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeOp;
    type IntoIter = std::vec::IntoIter<ChangeOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Why a dependency that differs from its channel version was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnalignedReason {
    IgnoredStream,
    IgnoredScope,
    IgnoredProperty,
    HardOverride,
    DowngradeRefused,
    ExternalPropertyNotInjected,
}

impl Display for UnalignedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnalignedReason::IgnoredStream => "stream is ignored",
            UnalignedReason::IgnoredScope => "scope is ignored",
            UnalignedReason::IgnoredProperty => "property is ignored",
            UnalignedReason::HardOverride => "version is overridden",
            UnalignedReason::DowngradeRefused => "downgrades are disabled",
            UnalignedReason::ExternalPropertyNotInjected => "external property injection is disabled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnalignedDependency {
    pub module: ModuleId,
    pub coordinate: Coordinate,
    pub current_version: String,
    pub channel_version: String,
    pub reason: UnalignedReason,
}

/// A recoverable problem attributable to one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub module: ModuleId,
    pub coordinate: Coordinate,
    pub property: Option<String>,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.property {
            Some(property) => write!(f, "{} (property {}): {}", self.coordinate, property, self.message),
            None => write!(f, "{}: {}", self.coordinate, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn set(module: usize, value: &str) -> ChangeOp {
        ChangeOp::SetProperty {
            module: ModuleId(module),
            name: "v".to_owned(),
            value: value.to_owned(),
        }
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut changes = ChangeSet::new();
        assert!(changes.push(set(0, "2.0")));
        assert!(!changes.push(set(0, "2.0")));
        assert!(changes.push(set(1, "2.0")));
        assert_eq!(changes.ops(), &[set(0, "2.0"), set(1, "2.0")]);
        assert_eq!(changes.for_module(ModuleId(1)).count(), 1);
    }
}
