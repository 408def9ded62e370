use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    align::AlignmentReport,
    changes::{ChangeOp, UnalignedReason},
    model::ParseError,
};

use super::Project;

/// The outcome of an alignment run as written to disk. Modules are named by
/// `group:artifact`, dependencies by their coordinate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanFile {
    #[serde(default)]
    pub not_covered: Vec<String>,
    #[serde(default)]
    pub changes: Vec<PlannedChange>,
    #[serde(default)]
    pub unaligned: Vec<PlannedUnaligned>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlannedChange {
    SetProperty {
        module: String,
        name: String,
        value: String,
    },
    InjectProperty {
        module: String,
        name: String,
        value: String,
    },
    OverrideInlineVersion {
        module: String,
        dependency: String,
        old_version: String,
        new_version: String,
    },
    InjectManagedDependency {
        module: String,
        dependency: String,
        version: String,
        original_version: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclusions: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedUnaligned {
    pub module: String,
    pub dependency: String,
    pub current_version: String,
    pub channel_version: String,
    pub reason: UnalignedReason,
}

const VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct VersionedPlanFile<'a> {
    pub version: i64,
    #[serde(flatten)]
    pub content: &'a PlanFile,
}

impl PlanFile {
    pub fn from_report(report: &AlignmentReport, project: &Project) -> PlanFile {
        let module = |id| project.module(id).to_string();
        let changes = report
            .changes
            .ops()
            .iter()
            .map(|op| match op {
                ChangeOp::SetProperty {
                    module: id,
                    name,
                    value,
                } => PlannedChange::SetProperty {
                    module: module(*id),
                    name: name.clone(),
                    value: value.clone(),
                },
                ChangeOp::InjectProperty {
                    module: id,
                    name,
                    value,
                } => PlannedChange::InjectProperty {
                    module: module(*id),
                    name: name.clone(),
                    value: value.clone(),
                },
                ChangeOp::OverrideInlineVersion {
                    module: id,
                    coordinate,
                    old_version,
                    new_version,
                } => PlannedChange::OverrideInlineVersion {
                    module: module(*id),
                    dependency: coordinate.to_string(),
                    old_version: old_version.clone(),
                    new_version: new_version.clone(),
                },
                ChangeOp::InjectManagedDependency {
                    module: id,
                    coordinate,
                    version,
                    exclusions,
                    original_version,
                } => PlannedChange::InjectManagedDependency {
                    module: module(*id),
                    dependency: coordinate.to_string(),
                    version: version.clone(),
                    original_version: original_version.clone(),
                    exclusions: exclusions.iter().map(ToString::to_string).collect(),
                },
            })
            .collect();
        let unaligned = report
            .unaligned
            .iter()
            .map(|unaligned| PlannedUnaligned {
                module: module(unaligned.module),
                dependency: unaligned.coordinate.to_string(),
                current_version: unaligned.current_version.clone(),
                channel_version: unaligned.channel_version.clone(),
                reason: unaligned.reason,
            })
            .collect();

        PlanFile {
            not_covered: report.not_covered.iter().map(ToString::to_string).collect(),
            changes,
            unaligned,
        }
    }

    pub fn from_file(file: &Path) -> Result<PlanFile, ParseError> {
        PlanFile::from_str(&std::fs::read_to_string(file)?)
    }

    pub fn from_str(s: &str) -> Result<PlanFile, ParseError> {
        let mut table = toml::from_str::<toml::Table>(s)?;
        match table.remove("version") {
            Some(toml::Value::Integer(VERSION)) => table.try_into::<PlanFile>().map_err(Into::into),
            Some(other) => Err(ParseError::UnsupportedPlanFileVersion(other)),
            None => Err(ParseError::MissingPlanFileVersion),
        }
    }

    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&VersionedPlanFile {
            version: VERSION,
            content: self,
        })
    }
}
