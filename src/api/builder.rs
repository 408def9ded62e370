use std::{env, error::Error, path::PathBuf};

use log::debug;

use crate::{
    channel::{LocalRepository, ManifestCoordinate},
    config::{AlignOptions, OptionDefaults},
    ChannelAligner,
};

const DEFAULT_CONFIG_FILE_NAME: &str = "channel-align.toml";

#[derive(Default)]
pub struct ChannelAlignerBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    project_file_name: Option<PathBuf>,
    channel_file_name: Option<PathBuf>,
    plan_file_name: Option<PathBuf>,
    config_file: Option<PathBuf>,
    local_repository: Option<PathBuf>,
    manifest: Option<ManifestCoordinate>,
    options: AlignOptions,
}

impl ChannelAlignerBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the project descriptor file.
    ///
    /// Defaults to `align-project.toml`.
    pub fn project_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file_name = Some(path.into());
        self
    }

    /// Name of the channel file.
    ///
    /// Defaults to `channel.toml`.
    pub fn channel_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.channel_file_name = Some(path.into());
        self
    }

    /// Name of the plan file written by `align`.
    ///
    /// Defaults to `align-plan.toml`.
    pub fn plan_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file_name = Some(path.into());
        self
    }

    /// File holding option defaults.
    ///
    /// Defaults to `channel-align.toml`. A missing file is not an error.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Location of the local Maven repository manifests are resolved in.
    ///
    /// Defaults to `$HOME/.m2/repository`.
    pub fn local_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_repository = Some(path.into());
        self
    }

    /// Manifest to use instead of the one referenced by the channel.
    pub fn manifest(mut self, coordinate: ManifestCoordinate) -> Self {
        self.manifest = Some(coordinate);
        self
    }

    /// Explicit options. Configured defaults only fill in options left at
    /// their default value.
    pub fn options(mut self, options: AlignOptions) -> Self {
        self.options = options;
        self
    }

    pub fn try_build(self) -> Result<ChannelAligner, Box<dyn Error>> {
        let Self {
            root,
            project_file_name,
            channel_file_name,
            plan_file_name,
            config_file,
            local_repository,
            manifest,
            mut options,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let config_file =
            root.join(config_file.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_NAME)));
        OptionDefaults::load(Some(&config_file))?.apply(&mut options)?;
        debug!("Aligning with options {options:?}");

        let local_repository = match local_repository.or_else(|| options.local_repository.clone()) {
            Some(path) => root.join(path),
            None => LocalRepository::default_location()?,
        };

        Ok(ChannelAligner {
            project_file_name: project_file_name
                .unwrap_or_else(|| PathBuf::from("align-project.toml")),
            channel_file_name: channel_file_name.unwrap_or_else(|| PathBuf::from("channel.toml")),
            plan_file_name: plan_file_name.unwrap_or_else(|| PathBuf::from("align-plan.toml")),
            local_repository: LocalRepository::new(local_repository),
            root,
            manifest,
            options,
        })
    }
}
