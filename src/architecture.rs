//! Project kinds, architecture layers and extension points derived from the
//! role tags the ecosystem analyzers attached to each declaration.

use crate::model::{ExtensionPoint, Project, ProjectSummary};
use crate::patterns::{Layer, Role};
use std::collections::HashMap;

/// Upper bound on extension points, regardless of corpus size.
pub const MAX_EXTENSION_POINTS: usize = 10;

const MODULE_BASED_LAYOUT: &str = "Module-based layout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Test,
    Api,
    Application,
    Library,
}

impl ProjectKind {
    pub fn of(project: &Project) -> Self {
        if project.is_test_project() {
            ProjectKind::Test
        } else if project.has_role(Role::Controller) || project.has_role(Role::View) {
            ProjectKind::Api
        } else if project.has_role(Role::Service) {
            ProjectKind::Application
        } else {
            ProjectKind::Library
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectKind::Test => "Test",
            ProjectKind::Api => "API/Presentation",
            ProjectKind::Application => "Application/Service",
            ProjectKind::Library => "Library",
        }
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            ProjectKind::Test => "Automated tests verifying other projects",
            ProjectKind::Api => "Presentation/API surface: controllers, views and request handling",
            ProjectKind::Application => "Application services and business logic",
            ProjectKind::Library => "Shared library/package of reusable code",
        }
    }
}

/// Everything the lightweight view needs beyond the raw model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub projects: Vec<ProjectSummary>,
    pub architecture_layers: Vec<String>,
    pub extension_points: Vec<ExtensionPoint>,
}

pub fn infer(projects: &[Project], key_namespace_limit: usize) -> Inference {
    Inference {
        projects: projects
            .iter()
            .map(|p| summarize_project(p, key_namespace_limit))
            .collect(),
        architecture_layers: architecture_layers(projects),
        extension_points: extension_points(projects),
    }
}

pub fn summarize_project(project: &Project, key_namespace_limit: usize) -> ProjectSummary {
    let kind = ProjectKind::of(project);
    ProjectSummary {
        name: project.name.clone(),
        kind: kind.label().to_string(),
        purpose: kind.purpose().to_string(),
        key_namespaces: key_namespaces(project, key_namespace_limit),
    }
}

/// Namespaces holding the most declarations first; ties keep discovery order.
pub fn key_namespaces(project: &Project, limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for decl in project.declarations() {
        *counts.entry(decl.namespace.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(usize, &String)> = project.namespaces.iter().enumerate().collect();
    // Stable sort preserves discovery order among equal counts.
    ranked.sort_by(|a, b| {
        let ca = counts.get(a.1.as_str()).copied().unwrap_or(0);
        let cb = counts.get(b.1.as_str()).copied().unwrap_or(0);
        cb.cmp(&ca)
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, ns)| ns.clone())
        .collect()
}

/// Presentation, Service and Data Access, in that order, when observed.
pub fn architecture_layers(projects: &[Project]) -> Vec<String> {
    let observed: Vec<Layer> = projects
        .iter()
        .flat_map(|p| p.pattern_tags.iter().map(|r| r.layer()))
        .filter(Layer::is_architectural)
        .collect();

    let layers: Vec<String> = [Layer::Presentation, Layer::Service, Layer::DataAccess]
        .iter()
        .filter(|layer| observed.contains(layer))
        .map(|layer| layer.as_str().to_string())
        .collect();

    if layers.is_empty() {
        vec![MODULE_BASED_LAYOUT.to_string()]
    } else {
        layers
    }
}

pub fn extension_points(projects: &[Project]) -> Vec<ExtensionPoint> {
    let mut points = Vec::new();

    'projects: for project in projects {
        let mut seen: Vec<Role> = Vec::new();
        for decl in project.declarations() {
            let Some(role) = decl.role else { continue };
            if seen.contains(&role) {
                continue;
            }
            seen.push(role);
            points.push(ExtensionPoint {
                layer: role.layer().as_str().to_string(),
                project: project.name.clone(),
                namespace: decl.namespace.clone(),
                pattern: role,
            });
            if points.len() == MAX_EXTENSION_POINTS {
                break 'projects;
            }
        }
    }

    points
}
