use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
    str::FromStr,
};

use log::{debug, error};
use serde::Deserialize;

use crate::model::ParseError;

use super::{
    ArtifactVersion, Coordinate, Dependency, DependencyGraph, DependencyLocation, Exclusion,
    ExternalParent, GraphNode, Module, ModuleId, Parent, Project,
};

/// Everything a project descriptor file describes: the module tree, the parents
/// outside of the project and the pre-built dependency graph of every module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub project: Project,
    pub external_parents: Vec<ExternalParent>,
    pub graphs: BTreeMap<ModuleId, DependencyGraph>,
}

#[derive(Deserialize, Debug)]
struct RawDescriptor {
    #[serde(default)]
    modules: Vec<RawModule>,
    #[serde(default)]
    external_parents: Vec<RawExternalParent>,
}

#[derive(Deserialize, Debug)]
struct RawModule {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(default)]
    execution_root: bool,
    parent: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    graph: Vec<RawGraphNode>,
}

#[derive(Deserialize, Debug)]
struct RawDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    scope: Option<String>,
    #[serde(rename = "type")]
    artifact_type: Option<String>,
    classifier: Option<String>,
    #[serde(default)]
    managed: bool,
    #[serde(default)]
    exclusions: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct RawGraphNode {
    artifact: String,
    scope: Option<String>,
    #[serde(default)]
    exclusions: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct RawExternalParent {
    group_id: String,
    artifact_id: String,
    version: String,
    parent: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

impl ProjectDescriptor {
    pub fn from_file(path: &Path) -> Result<ProjectDescriptor, ParseError> {
        debug!("Attempting to read project descriptor from {}", path.display());
        let contents = std::fs::read_to_string(path)?;

        let descriptor = ProjectDescriptor::from_toml_str(&contents);
        if let Err(err) = &descriptor {
            error!("Could not build a valid project from {} due to err {err}", path.display())
        }
        descriptor
    }

    pub fn from_toml_str(data: &str) -> Result<ProjectDescriptor, ParseError> {
        let raw = toml::from_str::<RawDescriptor>(data)?;

        let mut ids = HashMap::new();
        for (index, module) in raw.modules.iter().enumerate() {
            let gav = (
                module.group_id.as_str(),
                module.artifact_id.as_str(),
                module.version.as_str(),
            );
            if ids.insert(gav, ModuleId(index)).is_some() {
                return Err(ParseError::DuplicateModule(format!(
                    "{}:{}:{}",
                    module.group_id, module.artifact_id, module.version
                )));
            }
        }

        let mut modules = Vec::with_capacity(raw.modules.len());
        let mut graphs = BTreeMap::new();
        for (index, raw_module) in raw.modules.iter().enumerate() {
            let parent = match &raw_module.parent {
                None => None,
                Some(parent) => {
                    let parent = ArtifactVersion::from_str(parent)?;
                    let key = (
                        parent.coordinate.group_id.as_str(),
                        parent.coordinate.artifact_id.as_str(),
                        parent.version.as_str(),
                    );
                    Some(match ids.get(&key) {
                        Some(id) => Parent::Project(*id),
                        None => Parent::External(parent),
                    })
                }
            };

            let dependencies = raw_module
                .dependencies
                .iter()
                .map(parse_dependency)
                .collect::<Result<Vec<_>, _>>()?;

            if !raw_module.graph.is_empty() {
                let roots = raw_module
                    .graph
                    .iter()
                    .map(parse_graph_node)
                    .collect::<Result<Vec<_>, _>>()?;
                graphs.insert(ModuleId(index), DependencyGraph::new(roots));
            }

            modules.push(Module {
                group_id: raw_module.group_id.clone(),
                artifact_id: raw_module.artifact_id.clone(),
                version: raw_module.version.clone(),
                execution_root: raw_module.execution_root,
                parent,
                properties: raw_module.properties.clone(),
                dependencies,
            });
        }

        let external_parents = raw
            .external_parents
            .into_iter()
            .map(|raw| {
                let parent = raw
                    .parent
                    .as_deref()
                    .map(ArtifactVersion::from_str)
                    .transpose()?;
                Ok(ExternalParent {
                    artifact: Coordinate::new(raw.group_id, raw.artifact_id).at(raw.version),
                    parent,
                    properties: raw.properties,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(ProjectDescriptor {
            project: Project::new(modules)?,
            external_parents,
            graphs,
        })
    }
}

fn parse_dependency(raw: &RawDependency) -> Result<Dependency, ParseError> {
    let mut coordinate = Coordinate::new(&raw.group_id, &raw.artifact_id);
    if let Some(artifact_type) = &raw.artifact_type {
        coordinate = coordinate.with_type(artifact_type);
    }
    if let Some(classifier) = &raw.classifier {
        coordinate = coordinate.with_classifier(classifier);
    }

    Ok(Dependency {
        coordinate,
        version: raw.version.clone(),
        scope: raw.scope.clone(),
        exclusions: parse_exclusions(&raw.exclusions)?,
        location: if raw.managed {
            DependencyLocation::DependencyManagement
        } else {
            DependencyLocation::Dependencies
        },
    })
}

fn parse_graph_node(raw: &RawGraphNode) -> Result<GraphNode, ParseError> {
    Ok(GraphNode {
        artifact: ArtifactVersion::from_str(&raw.artifact)?,
        scope: raw.scope.clone(),
        exclusions: parse_exclusions(&raw.exclusions)?,
        children: Vec::new(),
    })
}

fn parse_exclusions(exclusions: &[String]) -> Result<BTreeSet<Exclusion>, ParseError> {
    exclusions
        .iter()
        .map(|exclusion| Exclusion::from_str(exclusion))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::ProjectError;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_valid_descriptor() {
        let str = r#"
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
            execution_root = true
            parent = "org.jboss:jboss-parent:39"
            [modules.properties]
            "version.netty" = "4.1.0"
            [[modules.dependencies]]
            group_id = "io.netty"
            artifact_id = "netty-all"
            version = "${version.netty}"
            managed = true
            exclusions = ["org.slf4j:*"]

            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-core"
            version = "1.0.0"
            parent = "org.acme:acme-parent:1.0.0"
            [[modules.dependencies]]
            group_id = "io.netty"
            artifact_id = "netty-all"
            scope = "test"
            [[modules.graph]]
            artifact = "io.netty:netty-buffer:4.1.0"
            exclusions = ["a:b"]

            [[external_parents]]
            group_id = "org.jboss"
            artifact_id = "jboss-parent"
            version = "39"
            [external_parents.properties]
            "version.junit" = "4.13"
        "#;
        let descriptor = ProjectDescriptor::from_toml_str(str).unwrap();
        let project = &descriptor.project;
        assert_eq!(project.root(), ModuleId(0));

        let parent = project.module(ModuleId(0));
        assert_eq!(
            parent.parent,
            Some(Parent::External(
                Coordinate::new("org.jboss", "jboss-parent").at("39")
            ))
        );
        assert_eq!(
            parent.dependencies,
            vec![Dependency {
                coordinate: Coordinate::new("io.netty", "netty-all"),
                version: Some("${version.netty}".to_owned()),
                scope: None,
                exclusions: BTreeSet::from([Exclusion::new("org.slf4j", "*")]),
                location: DependencyLocation::DependencyManagement,
            }]
        );

        let child = project.module(ModuleId(1));
        assert_eq!(child.parent, Some(Parent::Project(ModuleId(0))));
        assert_eq!(child.dependencies[0].version, None);
        assert_eq!(child.dependencies[0].effective_scope(), "test");

        assert_eq!(
            descriptor.graphs[&ModuleId(1)].roots[0].artifact,
            Coordinate::new("io.netty", "netty-buffer").at("4.1.0")
        );
        assert_eq!(
            descriptor.external_parents[0].properties["version.junit"],
            "4.13"
        );
    }

    #[test]
    fn load_descriptor_without_root() {
        let str = r#"
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
        "#;
        assert!(matches!(
            ProjectDescriptor::from_toml_str(str),
            Err(ParseError::Project(ProjectError::MissingExecutionRoot))
        ));
    }

    #[test]
    fn load_descriptor_with_duplicate_module() {
        let str = r#"
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
            execution_root = true
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
        "#;
        assert!(matches!(
            ProjectDescriptor::from_toml_str(str),
            Err(ParseError::DuplicateModule(_))
        ));
    }

    #[test]
    fn load_descriptor_with_bad_parent() {
        let str = r#"
            [[modules]]
            group_id = "org.acme"
            artifact_id = "acme-parent"
            version = "1.0.0"
            execution_root = true
            parent = "org.jboss"
        "#;
        assert!(matches!(
            ProjectDescriptor::from_toml_str(str),
            Err(ParseError::InvalidCoordinate(_))
        ));
    }
}
