use thiserror::Error;

pub mod manifest;
pub mod project;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading configuration toml: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid coordinate `{0}`, expected `group:artifact:version`")]
    InvalidCoordinate(String),
    #[error("Invalid exclusion `{0}`, expected `group:artifact`")]
    InvalidExclusion(String),
    #[error("Duplicate module {0} in project descriptor")]
    DuplicateModule(String),
    #[error("Project error: {0}")]
    Project(#[from] project::ProjectError),
    #[error("Unsupported plan file version {0}")]
    UnsupportedPlanFileVersion(toml::Value),
    #[error("Plan file has no version")]
    MissingPlanFileVersion,
}
