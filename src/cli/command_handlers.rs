use log::{debug, info, warn};

use crate::{
    align::{align, AlignmentReport},
    channel::{self, LocalRepository, ManifestCoordinate},
    config::AlignOptions,
    model::project::{descriptor::ProjectDescriptor, plan::PlanFile},
    resolver::{Collaborators, ExternalParents, ManifestOracle, StaticGraphBuilder},
    version::MavenVersionComparator,
};
use std::{error::Error, path::Path};

/// The files an alignment run reads.
#[derive(Debug, Clone, Copy)]
pub struct Workspace<'a> {
    pub root: &'a Path,
    pub project_file_name: &'a Path,
    pub channel_file_name: &'a Path,
    pub local_repository: &'a LocalRepository,
    pub manifest: Option<&'a ManifestCoordinate>,
}

/// Handler to align command
/// Writes the plan file unless it is already up to date
pub fn do_align(
    workspace: &Workspace,
    plan_file_name: &Path,
    options: &AlignOptions,
) -> Result<AlignmentReport, Box<dyn Error>> {
    let (descriptor, report) = run_alignment(workspace, options)?;
    let plan = PlanFile::from_report(&report, &descriptor.project);
    debug!("Generated plan: {:?}", plan);

    let plan_file_path = workspace.root.join(plan_file_name);
    let old_plan = if plan_file_path.exists() {
        PlanFile::from_file(&plan_file_path)
            .map_err(|err| warn!("Replacing unreadable plan file: {err}"))
            .ok()
    } else {
        None
    };

    if old_plan.is_some_and(|old_plan| old_plan == plan) {
        debug!("Plan file is up to date");
    } else {
        std::fs::write(&plan_file_path, plan.to_string()?)?;
        info!("Wrote plan file to {}", plan_file_path.display());
    }

    Ok(report)
}

/// Handler to verify command
/// Fails when any change is pending or any dependency was left behind the channel
pub fn do_verify(
    workspace: &Workspace,
    options: &AlignOptions,
) -> Result<AlignmentReport, Box<dyn Error>> {
    let (descriptor, report) = run_alignment(workspace, options)?;
    if report.is_aligned() {
        info!("Project is aligned with the channel");
        return Ok(report);
    }

    for (id, module) in descriptor.project.modules() {
        for op in report.changes.for_module(id) {
            info!("{module}: {op}");
        }
    }
    for unaligned in &report.unaligned {
        info!(
            "{}: {} stays at {} instead of {} ({})",
            descriptor.project.module(unaligned.module),
            unaligned.coordinate,
            unaligned.current_version,
            unaligned.channel_version,
            unaligned.reason
        );
    }
    Err(format!(
        "Project is not aligned with the channel: {} pending changes, {} unaligned dependencies",
        report.changes.len(),
        report.unaligned.len()
    )
    .into())
}

fn run_alignment(
    workspace: &Workspace,
    options: &AlignOptions,
) -> Result<(ProjectDescriptor, AlignmentReport), Box<dyn Error>> {
    let descriptor =
        ProjectDescriptor::from_file(&workspace.root.join(workspace.project_file_name))?;
    let manifest = channel::load_manifest(
        &workspace.root.join(workspace.channel_file_name),
        workspace.manifest,
        workspace.local_repository,
        &MavenVersionComparator,
    )?;

    let oracle = ManifestOracle::new(&manifest);
    let external = ExternalParents::new(descriptor.external_parents.clone());
    let graph = StaticGraphBuilder::from_descriptor(&descriptor);
    let collaborators = Collaborators {
        oracle: &oracle,
        external: &external,
        graph: &graph,
        comparator: &MavenVersionComparator,
    };
    let report = align(&descriptor.project, collaborators, options)?;

    if !report.warnings.is_empty() {
        warn!(
            "{} dependencies could not be aligned, see the warnings above",
            report.warnings.len()
        );
    }
    if !report.not_covered.is_empty() {
        info!(
            "{} dependencies are not covered by the channel",
            report.not_covered.len()
        );
    }
    Ok((descriptor, report))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    const PROJECT: &str = r#"
        [[modules]]
        group_id = "org.acme"
        artifact_id = "acme-parent"
        version = "1.0.0"
        execution_root = true

        [modules.properties]
        "version.netty" = "4.1.0"

        [[modules.dependencies]]
        group_id = "io.netty"
        artifact_id = "netty-all"
        version = "${version.netty}"
    "#;

    fn workspace_files(manifest_version: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("align-project.toml"), PROJECT).unwrap();
        fs::write(
            dir.path().join("channel.toml"),
            "[manifest]\npath = \"manifest.toml\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("manifest.toml"),
            format!(
                "[[streams]]\ngroup_id = \"io.netty\"\nartifact_id = \"*\"\nversion = \"{manifest_version}\"\n"
            ),
        )
        .unwrap();
        dir
    }

    fn check(dir: &Path, plan: Option<&Path>) -> Result<AlignmentReport, Box<dyn Error>> {
        let repository = LocalRepository::new(dir.join("repository"));
        let workspace = Workspace {
            root: dir,
            project_file_name: Path::new("align-project.toml"),
            channel_file_name: Path::new("channel.toml"),
            local_repository: &repository,
            manifest: None,
        };
        match plan {
            Some(plan) => do_align(&workspace, plan, &AlignOptions::default()),
            None => do_verify(&workspace, &AlignOptions::default()),
        }
    }

    #[test]
    fn align_writes_plan_file() {
        let dir = workspace_files("4.1.100.Final");
        let plan_file_name = PathBuf::from("align-plan.toml");
        let report = check(dir.path(), Some(&plan_file_name)).unwrap();
        assert_eq!(report.changes.len(), 1);

        let plan = PlanFile::from_file(&dir.path().join(&plan_file_name)).unwrap();
        assert_eq!(plan.changes.len(), 1);

        check(dir.path(), Some(&plan_file_name)).unwrap();
        assert_eq!(
            PlanFile::from_file(&dir.path().join(&plan_file_name)).unwrap(),
            plan
        );
    }

    #[test]
    fn verify_fails_on_pending_changes() {
        let dir = workspace_files("4.1.100.Final");
        assert!(check(dir.path(), None).is_err());
    }

    #[test]
    fn verify_aligned_project() {
        let dir = workspace_files("4.1.0");
        let report = check(dir.path(), None).unwrap();
        assert!(report.is_aligned());
    }
}
