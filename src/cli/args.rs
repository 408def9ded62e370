use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AlignOptions;

/// Aligns the dependency versions of a multi-module project with a channel.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub cmd: Command,
    /// Project root directory, other paths are relative to it
    #[arg(short, long)]
    pub root: Option<PathBuf>,
    /// Name of the project descriptor file
    #[arg(short, long, default_value = "align-project.toml")]
    pub project: PathBuf,
    /// Name of the channel file
    #[arg(short, long, default_value = "channel.toml")]
    pub channel: PathBuf,
    /// Name of the plan file written by `align`
    #[arg(long, default_value = "align-plan.toml")]
    pub plan: PathBuf,
    /// File holding option defaults [default: channel-align.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Local Maven repository manifests are resolved in [default: $HOME/.m2/repository]
    #[arg(long)]
    pub local_repository: Option<PathBuf>,
    /// Group id of a manifest replacing the channel's own
    #[arg(long)]
    pub manifest_group_id: Option<String>,
    /// Artifact id of a manifest replacing the channel's own
    #[arg(long)]
    pub manifest_artifact_id: Option<String>,
    /// Version of the replacing manifest, the latest one when omitted
    #[arg(long)]
    pub manifest_version: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decides the changes aligning the project and writes them to the plan file
    Align {
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Fails when the project is not aligned with the channel
    Verify {
        #[command(flatten)]
        policy: PolicyArgs,
    },
}

impl Command {
    pub fn policy(&self) -> &PolicyArgs {
        match self {
            Command::Align { policy } | Command::Verify { policy } => policy,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Never lower a version
    #[arg(long)]
    pub do_not_downgrade: bool,
    /// Override versions inline instead of changing properties
    #[arg(long)]
    pub inline_versions: bool,
    /// Leave properties inherited from external parents alone
    #[arg(long)]
    pub no_inject_external_properties: bool,
    /// Do not manage transitive only dependencies in the execution root
    #[arg(long)]
    pub no_inject_transitive_dependencies: bool,
    #[arg(long, value_delimiter = ',')]
    pub ignore_scopes: Vec<String>,
    /// `group:artifact` or `group:*`
    #[arg(long, value_delimiter = ',')]
    pub ignore_streams: Vec<String>,
    /// `group:artifact` or `group:*`, wins over a less specific ignored stream
    #[arg(long, value_delimiter = ',')]
    pub unignore_streams: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub ignore_properties: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub ignore_properties_prefixed_with: Vec<String>,
    /// `group:artifact` or `group:*`
    #[arg(long, value_delimiter = ',')]
    pub ignore_modules: Vec<String>,
    /// `name=value`
    #[arg(long, value_delimiter = ',')]
    pub override_properties: Vec<String>,
    /// `group:artifact:version`
    #[arg(long, value_delimiter = ',')]
    pub override_dependencies: Vec<String>,
}

impl From<PolicyArgs> for AlignOptions {
    fn from(args: PolicyArgs) -> Self {
        AlignOptions {
            do_not_downgrade: args.do_not_downgrade,
            inline_versions: args.inline_versions,
            inject_external_properties: !args.no_inject_external_properties,
            inject_transitive_dependencies: !args.no_inject_transitive_dependencies,
            ignore_scopes: args.ignore_scopes,
            ignore_streams: args.ignore_streams,
            unignore_streams: args.unignore_streams,
            ignore_properties: args.ignore_properties,
            ignore_properties_prefixed_with: args.ignore_properties_prefixed_with,
            ignore_modules: args.ignore_modules,
            override_properties: args.override_properties,
            override_dependencies: args.override_dependencies,
            local_repository: None,
        }
    }
}
