pub mod descriptor;
pub mod plan;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Debug, Display},
    str::FromStr,
};

use thiserror::Error;

use crate::model::ParseError;

pub const DEFAULT_TYPE: &str = "jar";
pub const DEFAULT_SCOPE: &str = "compile";

/// Identity of a dependency stream, without its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub artifact_type: String,
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Coordinate {
        Coordinate {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            artifact_type: DEFAULT_TYPE.to_owned(),
            classifier: None,
        }
    }

    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Coordinate {
        self.artifact_type = artifact_type.into();
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Coordinate {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn at(&self, version: impl Into<String>) -> ArtifactVersion {
        ArtifactVersion {
            coordinate: self.clone(),
            version: version.into(),
        }
    }

    /// Group and artifact only, used as the identity of a stream in a channel.
    pub fn stream(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        match &self.classifier {
            Some(classifier) => write!(f, ":{}:{}", self.artifact_type, classifier),
            None if self.artifact_type != DEFAULT_TYPE => write!(f, ":{}", self.artifact_type),
            None => Ok(()),
        }
    }
}

/// An actually declared occurrence of a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ArtifactVersion {
    pub coordinate: Coordinate,
    pub version: String,
}

impl Display for ArtifactVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.coordinate, self.version)
    }
}

impl FromStr for ArtifactVersion {
    type Err = ParseError;

    /// Accepts `g:a:v`, `g:a:type:v` and `g:a:type:classifier:v`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().split(':').collect::<Vec<_>>();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ParseError::InvalidCoordinate(s.to_owned()));
        }
        let coordinate = match parts.as_slice() {
            [group, artifact, _] => Coordinate::new(*group, *artifact),
            [group, artifact, artifact_type, _] => {
                Coordinate::new(*group, *artifact).with_type(*artifact_type)
            }
            [group, artifact, artifact_type, classifier, _] => Coordinate::new(*group, *artifact)
                .with_type(*artifact_type)
                .with_classifier(*classifier),
            _ => return Err(ParseError::InvalidCoordinate(s.to_owned())),
        };
        let version = parts[parts.len() - 1];
        Ok(coordinate.at(version))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Exclusion {
        Exclusion {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for Exclusion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((group, artifact))
                if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') =>
            {
                Ok(Exclusion::new(group, artifact))
            }
            _ => Err(ParseError::InvalidExclusion(s.to_owned())),
        }
    }
}

/// Which section of a module a dependency was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DependencyLocation {
    Dependencies,
    DependencyManagement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub coordinate: Coordinate,
    /// Raw declared version; `None` when it is inherited from dependency management.
    pub version: Option<String>,
    pub scope: Option<String>,
    pub exclusions: BTreeSet<Exclusion>,
    pub location: DependencyLocation,
}

impl Dependency {
    pub fn new(coordinate: Coordinate, version: impl Into<String>) -> Dependency {
        Dependency {
            coordinate,
            version: Some(version.into()),
            scope: None,
            exclusions: BTreeSet::new(),
            location: DependencyLocation::Dependencies,
        }
    }

    pub fn managed(coordinate: Coordinate, version: impl Into<String>) -> Dependency {
        Dependency {
            location: DependencyLocation::DependencyManagement,
            ..Dependency::new(coordinate, version)
        }
    }

    pub fn effective_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }
}

/// Index of a module inside its [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Project(ModuleId),
    /// A parent outside of the project, only reachable through an external property resolver.
    External(ArtifactVersion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub execution_root: bool,
    pub parent: Option<Parent>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
}

impl Module {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Module {
        Module {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            execution_root: false,
            parent: None,
            properties: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn gav(&self) -> ArtifactVersion {
        Coordinate::new(&self.group_id, &self.artifact_id).at(&self.version)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProjectError {
    #[error("No execution root module found in the project")]
    MissingExecutionRoot,
    #[error("Multiple execution root modules found: {}", .0.join(", "))]
    MultipleExecutionRoots(Vec<String>),
    #[error("Module {module} references unknown parent module #{parent}")]
    UnknownParent { module: String, parent: usize },
}

/// The arena of all modules taking part in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    modules: Vec<Module>,
    root: ModuleId,
}

impl Project {
    pub fn new(modules: Vec<Module>) -> Result<Project, ProjectError> {
        for module in &modules {
            if let Some(Parent::Project(parent)) = &module.parent {
                if parent.0 >= modules.len() {
                    return Err(ProjectError::UnknownParent {
                        module: module.to_string(),
                        parent: parent.0,
                    });
                }
            }
        }

        let roots = modules
            .iter()
            .enumerate()
            .filter(|(_, module)| module.execution_root)
            .collect::<Vec<_>>();
        let root = match roots.as_slice() {
            [] => return Err(ProjectError::MissingExecutionRoot),
            [(index, _)] => ModuleId(*index),
            _ => {
                return Err(ProjectError::MultipleExecutionRoots(
                    roots.iter().map(|(_, module)| module.to_string()).collect(),
                ))
            }
        };

        Ok(Project { modules, root })
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, module)| (ModuleId(index), module))
    }

    pub fn find(&self, group_id: &str, artifact_id: &str) -> Option<ModuleId> {
        self.modules()
            .find(|(_, module)| module.group_id == group_id && module.artifact_id == artifact_id)
            .map(|(id, _)| id)
    }

    /// True when the coordinate names one of the project's own modules.
    pub fn is_project_artifact(&self, coordinate: &Coordinate) -> bool {
        self.find(&coordinate.group_id, &coordinate.artifact_id)
            .is_some()
    }
}

/// A parent descriptor living outside of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalParent {
    pub artifact: ArtifactVersion,
    pub parent: Option<ArtifactVersion>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub artifact: ArtifactVersion,
    pub scope: Option<String>,
    pub exclusions: BTreeSet<Exclusion>,
    pub children: Vec<GraphNode>,
}

impl GraphNode {
    pub fn new(artifact: ArtifactVersion) -> GraphNode {
        GraphNode {
            artifact,
            scope: None,
            exclusions: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    pub fn effective_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }
}

/// Full dependency graph of a single module, rooted at its direct dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub roots: Vec<GraphNode>,
}

impl DependencyGraph {
    pub fn new(roots: Vec<GraphNode>) -> DependencyGraph {
        DependencyGraph { roots }
    }

    /// Depth-first walk over every node of the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        let mut stack = self.roots.iter().rev().collect::<Vec<_>>();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn root_module() -> Module {
        Module {
            execution_root: true,
            ..Module::new("org.acme", "acme-parent", "1.0")
        }
    }

    #[test]
    fn parse_artifact_version() {
        assert_eq!(
            ArtifactVersion::from_str("io.netty:netty-all:4.1.0").unwrap(),
            Coordinate::new("io.netty", "netty-all").at("4.1.0")
        );
        assert_eq!(
            ArtifactVersion::from_str("io.netty:netty-transport:jar:linux:4.1.0").unwrap(),
            Coordinate::new("io.netty", "netty-transport")
                .with_classifier("linux")
                .at("4.1.0")
        );
        assert!(ArtifactVersion::from_str("io.netty:netty-all").is_err());
        assert!(ArtifactVersion::from_str("io.netty::4.1.0").is_err());
    }

    #[test]
    fn display_coordinate() {
        assert_eq!(Coordinate::new("g", "a").to_string(), "g:a");
        assert_eq!(Coordinate::new("g", "a").with_type("pom").to_string(), "g:a:pom");
        assert_eq!(
            Coordinate::new("g", "a").with_classifier("tests").to_string(),
            "g:a:jar:tests"
        );
    }

    #[test]
    fn parse_exclusion() {
        assert_eq!(
            Exclusion::from_str("org.slf4j:*").unwrap(),
            Exclusion::new("org.slf4j", "*")
        );
        assert!(Exclusion::from_str("org.slf4j").is_err());
        assert!(Exclusion::from_str("a:b:c").is_err());
    }

    #[test]
    fn project_requires_single_root() {
        assert_eq!(
            Project::new(vec![Module::new("g", "a", "1")]),
            Err(ProjectError::MissingExecutionRoot)
        );
        let mut second = root_module();
        second.artifact_id = "other".to_owned();
        assert_eq!(
            Project::new(vec![root_module(), second]),
            Err(ProjectError::MultipleExecutionRoots(vec![
                "org.acme:acme-parent".to_owned(),
                "org.acme:other".to_owned()
            ]))
        );
        let project = Project::new(vec![Module::new("g", "child", "1"), root_module()]).unwrap();
        assert_eq!(project.root(), ModuleId(1));
    }

    #[test]
    fn project_rejects_unknown_parent() {
        let mut child = Module::new("g", "child", "1");
        child.parent = Some(Parent::Project(ModuleId(7)));
        assert!(matches!(
            Project::new(vec![root_module(), child]),
            Err(ProjectError::UnknownParent { parent: 7, .. })
        ));
    }

    #[test]
    fn graph_walk_is_depth_first() {
        let mut a = GraphNode::new(Coordinate::new("g", "a").at("1"));
        a.children.push(GraphNode::new(Coordinate::new("g", "a1").at("1")));
        let b = GraphNode::new(Coordinate::new("g", "b").at("1"));
        let graph = DependencyGraph::new(vec![a, b]);
        let visited = graph
            .nodes()
            .map(|node| node.artifact.coordinate.artifact_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(visited, vec!["a", "a1", "b"]);
    }
}
