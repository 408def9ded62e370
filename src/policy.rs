use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    str::FromStr,
};

use log::warn;
use thiserror::Error;

use crate::{
    changes::UnalignedReason,
    config::AlignOptions,
    model::project::{Coordinate, Module},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid stream `{0}`, expected `group:artifact` or `group:*`")]
    MalformedStream(String),
    #[error("Invalid dependency override `{0}`, expected `group:artifact:version`")]
    MalformedDependencyOverride(String),
    #[error("Invalid property override `{0}`, expected `name=value`")]
    MalformedPropertyOverride(String),
}

/// `group:artifact` or `group:*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct StreamPattern {
    pub group_id: String,
    /// `None` matches every artifact of the group.
    pub artifact_id: Option<String>,
}

impl StreamPattern {
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id
            && self
                .artifact_id
                .as_deref()
                .map_or(true, |artifact| artifact == artifact_id)
    }

    fn specificity(&self) -> u8 {
        match self.artifact_id {
            Some(_) => 1,
            None => 0,
        }
    }
}

impl FromStr for StreamPattern {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((group, artifact))
                if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') =>
            {
                Ok(StreamPattern {
                    group_id: group.to_owned(),
                    artifact_id: (artifact != "*").then(|| artifact.to_owned()),
                })
            }
            _ => Err(PolicyError::MalformedStream(s.to_owned())),
        }
    }
}

impl Display for StreamPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.group_id,
            self.artifact_id.as_deref().unwrap_or("*")
        )
    }
}

pub fn parse_dependency_override(s: &str) -> Result<((String, String), String), PolicyError> {
    match s.trim().split(':').collect::<Vec<_>>().as_slice() {
        [group, artifact, version]
            if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
        {
            Ok((
                (group.to_string(), artifact.to_string()),
                version.to_string(),
            ))
        }
        _ => Err(PolicyError::MalformedDependencyOverride(s.to_owned())),
    }
}

pub fn parse_property_override(s: &str) -> Result<(String, String), PolicyError> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(PolicyError::MalformedPropertyOverride(s.to_owned())),
    }
}

/// Ignore rules and hard overrides that take precedence over the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverridePolicy {
    ignore_streams: Vec<StreamPattern>,
    unignore_streams: Vec<StreamPattern>,
    ignore_scopes: BTreeSet<String>,
    ignore_properties: BTreeSet<String>,
    ignore_property_prefixes: Vec<String>,
    ignore_modules: Vec<StreamPattern>,
    property_overrides: BTreeMap<String, String>,
    dependency_overrides: BTreeMap<(String, String), String>,
}

impl OverridePolicy {
    /// Builds the policy from options. Malformed entries are logged and skipped.
    pub fn from_options(options: &AlignOptions) -> Self {
        OverridePolicy {
            ignore_streams: parse_all(&options.ignore_streams, StreamPattern::from_str),
            unignore_streams: parse_all(&options.unignore_streams, StreamPattern::from_str),
            ignore_scopes: options
                .ignore_scopes
                .iter()
                .map(|scope| scope.trim().to_owned())
                .collect(),
            ignore_properties: options
                .ignore_properties
                .iter()
                .map(|name| name.trim().to_owned())
                .collect(),
            ignore_property_prefixes: options
                .ignore_properties_prefixed_with
                .iter()
                .map(|prefix| prefix.trim().to_owned())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
            ignore_modules: parse_all(&options.ignore_modules, StreamPattern::from_str),
            property_overrides: parse_all(&options.override_properties, parse_property_override)
                .into_iter()
                .collect(),
            dependency_overrides: parse_all(
                &options.override_dependencies,
                parse_dependency_override,
            )
            .into_iter()
            .collect(),
        }
    }

    /// Ignore-stream and ignore-scope rules. A missing scope counts as `compile`.
    pub fn is_ignored(&self, coordinate: &Coordinate, scope: &str) -> Option<UnalignedReason> {
        if self.is_stream_ignored(coordinate) {
            Some(UnalignedReason::IgnoredStream)
        } else if self.ignore_scopes.contains(scope) {
            Some(UnalignedReason::IgnoredScope)
        } else {
            None
        }
    }

    /// A stream is ignored when an ignore pattern matches it and no strictly
    /// more specific do-not-ignore pattern does.
    pub fn is_stream_ignored(&self, coordinate: &Coordinate) -> bool {
        let matching = |patterns: &[StreamPattern]| {
            patterns
                .iter()
                .filter(|pattern| pattern.matches(&coordinate.group_id, &coordinate.artifact_id))
                .map(StreamPattern::specificity)
                .max()
        };
        match (
            matching(&self.ignore_streams),
            matching(&self.unignore_streams),
        ) {
            (None, _) => false,
            (Some(ignored), Some(unignored)) => unignored <= ignored,
            (Some(_), None) => true,
        }
    }

    pub fn is_scope_ignored(&self, scope: &str) -> bool {
        self.ignore_scopes.contains(scope)
    }

    pub fn is_property_ignored(&self, name: &str) -> bool {
        self.ignore_properties.contains(name)
            || self
                .ignore_property_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn is_module_ignored(&self, module: &Module) -> bool {
        self.ignore_modules
            .iter()
            .any(|pattern| pattern.matches(&module.group_id, &module.artifact_id))
    }

    pub fn hard_property_override(&self, name: &str) -> Option<&str> {
        self.property_overrides.get(name).map(String::as_str)
    }

    pub fn hard_dependency_override(&self, coordinate: &Coordinate) -> Option<&str> {
        self.dependency_overrides
            .get(&(coordinate.group_id.clone(), coordinate.artifact_id.clone()))
            .map(String::as_str)
    }
}

fn parse_all<T>(entries: &[String], parse: impl Fn(&str) -> Result<T, PolicyError>) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| match parse(entry) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Skipping override entry: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_stream_patterns() {
        assert_eq!(
            StreamPattern::from_str("io.netty:*").unwrap(),
            StreamPattern {
                group_id: "io.netty".to_owned(),
                artifact_id: None
            }
        );
        assert_eq!(
            StreamPattern::from_str("io.netty:netty-all").unwrap().to_string(),
            "io.netty:netty-all"
        );
        assert!(StreamPattern::from_str("io.netty").is_err());
        assert!(StreamPattern::from_str("a:b:c").is_err());
    }

    #[test]
    fn parse_overrides() {
        assert_eq!(
            parse_dependency_override("junit:junit:4.13.2").unwrap(),
            (("junit".to_owned(), "junit".to_owned()), "4.13.2".to_owned())
        );
        assert!(parse_dependency_override("junit:junit").is_err());
        assert!(parse_dependency_override("junit::4.13").is_err());
        assert_eq!(
            parse_property_override("version.junit = 4.13.2").unwrap(),
            ("version.junit".to_owned(), "4.13.2".to_owned())
        );
        assert!(parse_property_override("version.junit").is_err());
        assert!(parse_property_override("=4.13").is_err());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let policy = OverridePolicy::from_options(&AlignOptions {
            override_dependencies: strings(&["junit:junit", "org.slf4j:slf4j-api:2.0.9"]),
            override_properties: strings(&["broken", "v=1.0"]),
            ..Default::default()
        });
        assert_eq!(policy.hard_dependency_override(&Coordinate::new("junit", "junit")), None);
        assert_eq!(
            policy.hard_dependency_override(&Coordinate::new("org.slf4j", "slf4j-api")),
            Some("2.0.9")
        );
        assert_eq!(policy.hard_property_override("v"), Some("1.0"));
        assert_eq!(policy.hard_property_override("broken"), None);
    }

    #[test]
    fn more_specific_unignore_wins() {
        let policy = OverridePolicy::from_options(&AlignOptions {
            ignore_streams: strings(&["io.netty:*", "junit:junit"]),
            unignore_streams: strings(&["io.netty:netty-buffer", "junit:*"]),
            ..Default::default()
        });
        assert!(policy.is_stream_ignored(&Coordinate::new("io.netty", "netty-all")));
        assert!(!policy.is_stream_ignored(&Coordinate::new("io.netty", "netty-buffer")));
        assert!(policy.is_stream_ignored(&Coordinate::new("junit", "junit")));
        assert!(!policy.is_stream_ignored(&Coordinate::new("org.slf4j", "slf4j-api")));
    }

    #[test]
    fn ignore_scopes_and_properties() {
        let policy = OverridePolicy::from_options(&AlignOptions {
            ignore_scopes: strings(&["test"]),
            ignore_properties: strings(&["version.junit"]),
            ignore_properties_prefixed_with: strings(&["legacy."]),
            ..Default::default()
        });
        let coordinate = Coordinate::new("junit", "junit");
        assert_eq!(
            policy.is_ignored(&coordinate, "test"),
            Some(UnalignedReason::IgnoredScope)
        );
        assert_eq!(policy.is_ignored(&coordinate, "compile"), None);
        assert!(policy.is_property_ignored("version.junit"));
        assert!(policy.is_property_ignored("legacy.netty"));
        assert!(!policy.is_property_ignored("version.netty"));
    }

    #[test]
    fn ignore_modules() {
        let policy = OverridePolicy::from_options(&AlignOptions {
            ignore_modules: strings(&["org.acme:acme-testsuite"]),
            ..Default::default()
        });
        assert!(policy.is_module_ignored(&Module::new("org.acme", "acme-testsuite", "1")));
        assert!(!policy.is_module_ignored(&Module::new("org.acme", "acme-core", "1")));
    }
}
