//! Structural model of an analysed source tree.
//!
//! An [`AggregateAnalysis`] is assembled once per run from the projects every
//! ecosystem analyzer discovered; its summary, conventions and both rendered
//! contexts are derived at construction and cannot be edited afterwards.

use crate::architecture;
use crate::config::AnalysisConfig;
use crate::languages::DeclarationKind;
use crate::patterns::{self, Role};
use crate::render;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Version of the serialised aggregate layout.
pub const SCHEMA_VERSION: u32 = 1;

/// A `(name, version)` pair declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyReference {
    pub name: String,
    pub version: Option<String>,
}

impl DependencyReference {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// A type (class/struct/enum) or interface (interface/trait) found in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub namespace: String,
    /// Source file relative to the analysis root, `/`-separated.
    pub source_file: String,
    pub supertypes: Vec<String>,
    pub role: Option<Role>,
    pub start_line: usize,
    pub end_line: usize,
}

/// Interfaces and traits share the type record layout.
pub type InterfaceInfo = TypeInfo;

/// One compilation/package unit rooted at a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Manifest path relative to the analysis root, `/`-separated.
    pub manifest_path: String,
    /// Project directory relative to the analysis root; `"."` for the root.
    pub relative_dir: String,
    pub ecosystem: String,
    /// Declared target: edition, target framework, language version, UI framework.
    pub target: Option<String>,
    pub root_namespace: String,
    pub dependencies: Vec<DependencyReference>,
    pub types: Vec<TypeInfo>,
    pub interfaces: Vec<InterfaceInfo>,
    pub namespaces: Vec<String>,
    pub pattern_tags: Vec<Role>,
}

impl Project {
    pub fn is_test_project(&self) -> bool {
        patterns::is_test_project_name(&self.name) || self.pattern_tags.contains(&Role::UnitTest)
    }

    /// Types and interfaces in source order: walk order of their files, then
    /// line. Each list keeps its own discovery order.
    pub fn declarations(&self) -> impl Iterator<Item = &TypeInfo> {
        self.declarations_by_kind().map(|(_, decl)| decl)
    }

    /// [`Project::declarations`] tagged with the kind of each entry.
    pub fn declarations_by_kind(&self) -> impl Iterator<Item = (DeclarationKind, &TypeInfo)> {
        let mut types = self.types.iter().peekable();
        let mut interfaces = self.interfaces.iter().peekable();
        std::iter::from_fn(move || {
            let take_interface = match (types.peek(), interfaces.peek()) {
                (Some(t), Some(i)) => source_position(i) < source_position(t),
                (None, Some(_)) => true,
                _ => false,
            };
            if take_interface {
                interfaces.next().map(|i| (DeclarationKind::Interface, i))
            } else {
                types.next().map(|t| (DeclarationKind::Type, t))
            }
        })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.pattern_tags.contains(&role)
    }
}

/// Component-wise path order matches the sorted walk that found the files.
fn source_position(decl: &TypeInfo) -> (&Path, usize) {
    (Path::new(&decl.source_file), decl.start_line)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub project_count: usize,
    pub test_project_count: usize,
    pub type_count: usize,
    pub interface_count: usize,
    pub dependency_count: usize,
    /// Distinct ecosystems in project order.
    pub ecosystems: Vec<String>,
    pub primary_ecosystem: Option<String>,
    pub top_namespaces: Vec<String>,
}

impl Summary {
    pub fn from_projects(projects: &[Project], top_namespace_limit: usize) -> Self {
        let mut ecosystems: Vec<String> = Vec::new();
        let mut ecosystem_counts: HashMap<&str, usize> = HashMap::new();
        let mut namespace_counts: HashMap<&str, usize> = HashMap::new();

        for project in projects {
            if !ecosystems.contains(&project.ecosystem) {
                ecosystems.push(project.ecosystem.clone());
            }
            *ecosystem_counts.entry(project.ecosystem.as_str()).or_default() += 1;
            for decl in project.declarations() {
                *namespace_counts.entry(decl.namespace.as_str()).or_default() += 1;
            }
        }

        // Ties keep first-seen (registration) order.
        let mut primary_ecosystem: Option<String> = None;
        let mut best = 0;
        for ecosystem in &ecosystems {
            let count = ecosystem_counts.get(ecosystem.as_str()).copied().unwrap_or(0);
            if count > best {
                best = count;
                primary_ecosystem = Some(ecosystem.clone());
            }
        }

        let mut ranked: Vec<(&str, usize)> = namespace_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let top_namespaces = ranked
            .into_iter()
            .take(top_namespace_limit)
            .map(|(ns, _)| ns.to_string())
            .collect();

        Self {
            project_count: projects.len(),
            test_project_count: projects.iter().filter(|p| p.is_test_project()).count(),
            type_count: projects.iter().map(|p| p.types.len()).sum(),
            interface_count: projects.iter().map(|p| p.interfaces.len()).sum(),
            dependency_count: projects.iter().map(|p| p.dependencies.len()).sum(),
            ecosystems,
            primary_ecosystem,
            top_namespaces,
        }
    }
}

/// Coding conventions of the analysed code base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conventions {
    pub naming_style: String,
    pub private_member_prefix: String,
}

impl Conventions {
    pub fn new(naming_style: &str, private_member_prefix: &str) -> Self {
        Self {
            naming_style: naming_style.to_string(),
            private_member_prefix: private_member_prefix.to_string(),
        }
    }
}

impl Default for Conventions {
    fn default() -> Self {
        Self::new("Unknown", "")
    }
}

/// Where new code of a given role currently lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPoint {
    pub layer: String,
    pub project: String,
    pub namespace: String,
    pub pattern: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub kind: String,
    pub purpose: String,
    pub key_namespaces: Vec<String>,
}

/// Lightweight rendering of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryContext {
    pub text: String,
    pub token_estimate: usize,
    pub projects: Vec<ProjectSummary>,
    pub architecture_layers: Vec<String>,
    pub technologies: Vec<String>,
    pub extension_points: Vec<ExtensionPoint>,
}

/// Detailed rendering of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailContext {
    pub text: String,
    pub token_estimate: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateAnalysis {
    schema_version: u32,
    name: String,
    root_path: PathBuf,
    analyzed_at: DateTime<Utc>,
    projects: Vec<Project>,
    summary: Summary,
    conventions: Conventions,
    summary_context: SummaryContext,
    detail_context: DetailContext,
}

impl AggregateAnalysis {
    /// Derives summary and both contexts from `projects`, which must already be
    /// in registration-then-discovery order.
    pub fn new(
        name: &str,
        root_path: &Path,
        projects: Vec<Project>,
        conventions: Conventions,
        config: &AnalysisConfig,
    ) -> Self {
        let summary = Summary::from_projects(&projects, config.top_namespace_limit);
        let inference = architecture::infer(&projects, config.key_namespace_limit);
        let summary_context = render::render_summary(name, &projects, &summary, inference);
        let detail_context = render::render_detail(
            name,
            &projects,
            &summary,
            &conventions,
            config.detail_declaration_cap,
        );

        Self {
            schema_version: SCHEMA_VERSION,
            name: name.to_string(),
            root_path: root_path.to_path_buf(),
            analyzed_at: Utc::now(),
            projects,
            summary,
            conventions,
            summary_context,
            detail_context,
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    pub fn summary_context(&self) -> &SummaryContext {
        &self.summary_context
    }

    pub fn detail_context(&self) -> &DetailContext {
        &self.detail_context
    }

    pub fn summary_text(&self) -> &str {
        &self.summary_context.text
    }

    pub fn full_context_text(&self) -> &str {
        &self.detail_context.text
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{project, type_info};
    use super::*;

    #[test]
    fn test_test_project_by_name_only() {
        let p = project("Foo.Tests", "dotnet", vec![type_info("Fixture", "Foo.Tests", None)]);
        assert!(p.is_test_project());
    }

    #[test]
    fn test_test_project_by_tag() {
        let p = project(
            "checks",
            "rust",
            vec![type_info("Harness", "checks", Some(Role::UnitTest))],
        );
        assert!(p.is_test_project());
        let p = project("core", "rust", vec![type_info("Engine", "core", None)]);
        assert!(!p.is_test_project());
    }

    #[test]
    fn test_summary_counts_and_primary_ecosystem() {
        let projects = vec![
            project("web", "frontend", vec![type_info("App", "src", None)]),
            project("api", "rust", vec![type_info("Router", "api", None)]),
            project("core", "rust", vec![type_info("Engine", "core", None)]),
        ];
        let summary = Summary::from_projects(&projects, 10);
        assert_eq!(summary.project_count, 3);
        assert_eq!(summary.type_count, 3);
        assert_eq!(summary.ecosystems, vec!["frontend", "rust"]);
        assert_eq!(summary.primary_ecosystem.as_deref(), Some("rust"));
    }

    #[test]
    fn test_declarations_follow_source_order() {
        let mut early_trait = type_info("Clock", "app", None);
        early_trait.source_file = "src/bin/server.rs".to_string();
        early_trait.start_line = 2;
        let mut server = type_info("ApiHandler", "app", None);
        server.source_file = "src/bin/server.rs".to_string();
        server.start_line = 8;
        let mut store = type_info("UserStore", "app", None);
        store.source_file = "src/lib.rs".to_string();
        let mut late_trait = type_info("Repository", "app", None);
        late_trait.source_file = "src/lib.rs".to_string();
        late_trait.start_line = 10;

        let mut p = project("app", "rust", vec![server, store]);
        p.interfaces = vec![early_trait, late_trait];

        let order: Vec<_> = p
            .declarations_by_kind()
            .map(|(kind, d)| (kind, d.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (DeclarationKind::Interface, "Clock"),
                (DeclarationKind::Type, "ApiHandler"),
                (DeclarationKind::Type, "UserStore"),
                (DeclarationKind::Interface, "Repository"),
            ]
        );
    }

    #[test]
    fn test_summary_primary_ecosystem_tie_keeps_first() {
        let projects = vec![
            project("web", "frontend", vec![]),
            project("api", "rust", vec![]),
        ];
        let summary = Summary::from_projects(&projects, 10);
        assert_eq!(summary.primary_ecosystem.as_deref(), Some("frontend"));
    }

    #[test]
    fn test_summary_top_namespaces_ranked() {
        let projects = vec![project(
            "core",
            "rust",
            vec![
                type_info("A", "core::b", None),
                type_info("B", "core::a", None),
                type_info("C", "core::b", None),
                type_info("D", "core::c", None),
            ],
        )];
        let summary = Summary::from_projects(&projects, 2);
        assert_eq!(summary.top_namespaces, vec!["core::b", "core::a"]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::from_projects(&[], 10);
        assert_eq!(summary.project_count, 0);
        assert!(summary.ecosystems.is_empty());
        assert!(summary.primary_ecosystem.is_none());
    }

    #[test]
    fn test_aggregate_json_roundtrip_fields() {
        let projects = vec![project("core", "rust", vec![type_info("Engine", "core", None)])];
        let analysis = AggregateAnalysis::new(
            "demo",
            Path::new("/repo"),
            projects,
            Conventions::new("snake_case", ""),
            &AnalysisConfig::default(),
        );
        let json = analysis.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["projects"][0]["types"][0]["name"], "Engine");
        assert!(value["summary_context"]["text"].is_string());
        assert!(value["detail_context"]["token_estimate"].is_number());
    }
}
