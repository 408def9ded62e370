use std::error::Error;

use channel_align::{
    channel::ManifestCoordinate,
    cli::args::{CliArgs, Command},
    ChannelAligner,
};
use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli_args = CliArgs::parse();

    let mut builder = ChannelAligner::builder()
        .project_file_name(&cli_args.project)
        .channel_file_name(&cli_args.channel)
        .plan_file_name(&cli_args.plan)
        .options(cli_args.cmd.policy().clone().into());
    if let Some(root) = &cli_args.root {
        builder = builder.root(root);
    }
    if let Some(config) = &cli_args.config {
        builder = builder.config_file(config);
    }
    if let Some(local_repository) = &cli_args.local_repository {
        builder = builder.local_repository(local_repository);
    }
    if let Some(manifest) = ManifestCoordinate::from_parts(
        cli_args.manifest_group_id,
        cli_args.manifest_artifact_id,
        cli_args.manifest_version,
    )? {
        builder = builder.manifest(manifest);
    }
    let aligner = builder.try_build()?;

    match cli_args.cmd {
        Command::Align { .. } => {
            aligner.align()?;
        }
        Command::Verify { .. } => {
            aligner.verify()?;
        }
    }
    Ok(())
}
