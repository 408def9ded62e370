use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, Environment, File, FileFormat, Value, ValueKind};
use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error while loading configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid value for configuration key `{key}`: {error}")]
    InvalidValue {
        key: String,
        error: config::ConfigError,
    },
}

/// Every option that steers an alignment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignOptions {
    /// Refuse changes that would lower a version.
    pub do_not_downgrade: bool,
    /// Always override versions inline instead of changing properties.
    pub inline_versions: bool,
    /// Define properties inherited from external parents in the project.
    pub inject_external_properties: bool,
    pub inject_transitive_dependencies: bool,
    pub ignore_scopes: Vec<String>,
    pub ignore_streams: Vec<String>,
    pub unignore_streams: Vec<String>,
    pub ignore_properties: Vec<String>,
    pub ignore_properties_prefixed_with: Vec<String>,
    pub ignore_modules: Vec<String>,
    /// `name=value` entries.
    pub override_properties: Vec<String>,
    /// `group:artifact:version` entries.
    pub override_dependencies: Vec<String>,
    pub local_repository: Option<PathBuf>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions {
            do_not_downgrade: false,
            inline_versions: false,
            inject_external_properties: true,
            inject_transitive_dependencies: true,
            ignore_scopes: Vec::new(),
            ignore_streams: Vec::new(),
            unignore_streams: Vec::new(),
            ignore_properties: Vec::new(),
            ignore_properties_prefixed_with: Vec::new(),
            ignore_modules: Vec::new(),
            override_properties: Vec::new(),
            override_dependencies: Vec::new(),
            local_repository: None,
        }
    }
}

type Setter = fn(&mut AlignOptions, Value) -> Result<(), config::ConfigError>;

/// Option name and the setter applying a configured default to it. Every setter
/// leaves fields alone that no longer hold their declared default.
const SETTERS: &[(&str, Setter)] = &[
    ("do_not_downgrade", |options, value| {
        set_flag(&mut options.do_not_downgrade, false, value)
    }),
    ("inline_versions", |options, value| {
        set_flag(&mut options.inline_versions, false, value)
    }),
    ("inject_external_properties", |options, value| {
        set_flag(&mut options.inject_external_properties, true, value)
    }),
    ("inject_transitive_dependencies", |options, value| {
        set_flag(&mut options.inject_transitive_dependencies, true, value)
    }),
    ("ignore_scopes", |options, value| {
        set_list(&mut options.ignore_scopes, value)
    }),
    ("ignore_streams", |options, value| {
        set_list(&mut options.ignore_streams, value)
    }),
    ("unignore_streams", |options, value| {
        set_list(&mut options.unignore_streams, value)
    }),
    ("ignore_properties", |options, value| {
        set_list(&mut options.ignore_properties, value)
    }),
    ("ignore_properties_prefixed_with", |options, value| {
        set_list(&mut options.ignore_properties_prefixed_with, value)
    }),
    ("ignore_modules", |options, value| {
        set_list(&mut options.ignore_modules, value)
    }),
    ("override_properties", |options, value| {
        set_list(&mut options.override_properties, value)
    }),
    ("override_dependencies", |options, value| {
        set_list(&mut options.override_dependencies, value)
    }),
    ("local_repository", |options, value| {
        if options.local_repository.is_none() {
            options.local_repository = Some(PathBuf::from(value.into_string()?));
        }
        Ok(())
    }),
];

fn set_flag(field: &mut bool, default: bool, value: Value) -> Result<(), config::ConfigError> {
    if *field == default {
        *field = value.into_bool()?;
    }
    Ok(())
}

fn set_list(field: &mut Vec<String>, value: Value) -> Result<(), config::ConfigError> {
    if !field.is_empty() {
        return Ok(());
    }
    *field = match value.kind {
        ValueKind::Array(values) => values
            .into_iter()
            .map(Value::into_string)
            .collect::<Result<Vec<_>, _>>()?,
        _ => value
            .into_string()?
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect(),
    };
    Ok(())
}

/// Option defaults from a configuration file and `CHANNEL_ALIGN_*` environment variables.
#[derive(Debug, Default)]
pub struct OptionDefaults {
    values: HashMap<String, Value>,
}

impl OptionDefaults {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, None)
    }

    fn load_from(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            debug!("Loading option defaults from {}", file.display());
            builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(false));
        }
        let values = builder
            .add_source(
                Environment::with_prefix("CHANNEL_ALIGN")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize::<HashMap<String, Value>>()?;

        Ok(OptionDefaults { values })
    }

    /// Applies the defaults to every option still holding its declared default.
    pub fn apply(self, options: &mut AlignOptions) -> Result<(), ConfigError> {
        for (key, value) in self.values {
            match SETTERS.iter().find(|(name, _)| *name == key) {
                Some((_, setter)) => setter(options, value)
                    .map_err(|error| ConfigError::InvalidValue { key, error })?,
                None => warn!("Ignoring unknown configuration key `{key}`"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_empty() {
        let defaults = OptionDefaults::load_from(None, Some(HashMap::new())).unwrap();
        let mut options = AlignOptions::default();
        defaults.apply(&mut options).unwrap();
        assert_eq!(options, AlignOptions::default());
    }

    #[test]
    fn load_environment() {
        let env = HashMap::from([
            ("CHANNEL_ALIGN_DO_NOT_DOWNGRADE".to_owned(), "true".to_owned()),
            (
                "CHANNEL_ALIGN_IGNORE_SCOPES".to_owned(),
                "test, provided".to_owned(),
            ),
            (
                "CHANNEL_ALIGN_INJECT_TRANSITIVE_DEPENDENCIES".to_owned(),
                "false".to_owned(),
            ),
        ]);
        let defaults = OptionDefaults::load_from(None, Some(env)).unwrap();
        let mut options = AlignOptions::default();
        defaults.apply(&mut options).unwrap();
        assert_eq!(
            options,
            AlignOptions {
                do_not_downgrade: true,
                inject_transitive_dependencies: false,
                ignore_scopes: vec!["test".to_owned(), "provided".to_owned()],
                ..Default::default()
            }
        );
    }

    #[test]
    fn load_file_without_overriding_explicit_options() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            inline_versions = true
            ignore_streams = ["io.netty:*"]
            override_properties = ["version.junit=4.13.2"]
            "#
        )
        .unwrap();

        let defaults = OptionDefaults::load_from(Some(file.path()), Some(HashMap::new())).unwrap();
        let mut options = AlignOptions {
            ignore_streams: vec!["junit:junit".to_owned()],
            ..Default::default()
        };
        defaults.apply(&mut options).unwrap();
        assert_eq!(
            options,
            AlignOptions {
                inline_versions: true,
                ignore_streams: vec!["junit:junit".to_owned()],
                override_properties: vec!["version.junit=4.13.2".to_owned()],
                ..Default::default()
            }
        );
    }

    #[test]
    fn invalid_value_is_an_error() {
        let env = HashMap::from([(
            "CHANNEL_ALIGN_DO_NOT_DOWNGRADE".to_owned(),
            "maybe".to_owned(),
        )]);
        let defaults = OptionDefaults::load_from(None, Some(env)).unwrap();
        let mut options = AlignOptions::default();
        assert!(matches!(
            defaults.apply(&mut options),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
