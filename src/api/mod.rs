use std::{error::Error, path::PathBuf};

use crate::{
    align::AlignmentReport,
    channel::{LocalRepository, ManifestCoordinate},
    cli::command_handlers::{do_align, do_verify, Workspace},
    config::AlignOptions,
};

mod builder;

pub use builder::ChannelAlignerBuilder;

pub struct ChannelAligner {
    root: PathBuf,
    project_file_name: PathBuf,
    channel_file_name: PathBuf,
    plan_file_name: PathBuf,
    local_repository: LocalRepository,
    manifest: Option<ManifestCoordinate>,
    options: AlignOptions,
}

impl ChannelAligner {
    pub fn builder() -> ChannelAlignerBuilder {
        ChannelAlignerBuilder::default()
    }

    /// Options in effect, after configuration defaults were applied.
    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    /// Aligns the project with the channel and writes the plan file
    pub fn align(&self) -> Result<AlignmentReport, Box<dyn Error>> {
        do_align(&self.workspace(), &self.plan_file_name, &self.options)
    }

    /// Fails unless the project is already aligned with the channel
    pub fn verify(&self) -> Result<AlignmentReport, Box<dyn Error>> {
        do_verify(&self.workspace(), &self.options)
    }

    fn workspace(&self) -> Workspace<'_> {
        Workspace {
            root: &self.root,
            project_file_name: &self.project_file_name,
            channel_file_name: &self.channel_file_name,
            local_repository: &self.local_repository,
            manifest: self.manifest.as_ref(),
        }
    }
}
