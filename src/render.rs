//! Text renderings of an analysed tree for prompt construction.
//!
//! Both renderings depend only on the model, never on the clock or on hash
//! iteration order, so an unchanged tree renders to byte-identical text.

use crate::architecture::Inference;
use crate::languages::DeclarationKind;
use crate::model::{Conventions, DetailContext, Project, Summary, SummaryContext, TypeInfo};
use std::fmt::Write;

const NONE_DETECTED: &str = "- None detected";

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Distinct ecosystems with their declared targets, e.g. `dotnet (net8.0, net6.0)`.
pub fn technologies(projects: &[Project], summary: &Summary) -> Vec<String> {
    summary
        .ecosystems
        .iter()
        .map(|ecosystem| {
            let mut targets: Vec<&str> = Vec::new();
            for project in projects.iter().filter(|p| &p.ecosystem == ecosystem) {
                if let Some(target) = project.target.as_deref() {
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
            }
            if targets.is_empty() {
                ecosystem.clone()
            } else {
                format!("{} ({})", ecosystem, targets.join(", "))
            }
        })
        .collect()
}

fn push_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str(NONE_DETECTED);
        out.push('\n');
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

pub fn render_summary(
    name: &str,
    projects: &[Project],
    summary: &Summary,
    inference: Inference,
) -> SummaryContext {
    let technologies = technologies(projects, summary);
    let mut text = String::new();

    let _ = writeln!(text, "# Architecture Summary: {}", name);
    let _ = writeln!(
        text,
        "Projects: {} ({} test) | Types: {} | Interfaces: {} | Dependencies: {}",
        summary.project_count,
        summary.test_project_count,
        summary.type_count,
        summary.interface_count,
        summary.dependency_count
    );
    if let Some(primary) = &summary.primary_ecosystem {
        let _ = writeln!(text, "Primary ecosystem: {}", primary);
    }

    text.push_str("\n## Projects\n");
    if inference.projects.is_empty() {
        text.push_str(NONE_DETECTED);
        text.push('\n');
    }
    for (project, ps) in projects.iter().zip(&inference.projects) {
        let _ = writeln!(
            text,
            "- {} [{}] ({}): {}",
            ps.name, ps.kind, project.ecosystem, ps.purpose
        );
        if !ps.key_namespaces.is_empty() {
            let _ = writeln!(text, "  Key namespaces: {}", ps.key_namespaces.join(", "));
        }
    }

    text.push_str("\n## Architecture\n");
    push_list(&mut text, &inference.architecture_layers);

    text.push_str("\n## Technologies\n");
    push_list(&mut text, &technologies);

    text.push_str("\n## Extension Points\n");
    let points: Vec<String> = inference
        .extension_points
        .iter()
        .map(|ep| format!("{}: {} in {} ({})", ep.pattern, ep.layer, ep.project, ep.namespace))
        .collect();
    push_list(&mut text, &points);

    SummaryContext {
        token_estimate: estimate_tokens(&text),
        text,
        projects: inference.projects,
        architecture_layers: inference.architecture_layers,
        technologies,
        extension_points: inference.extension_points,
    }
}

fn declaration_line(decl: &TypeInfo) -> String {
    let mut line = format!("- {}::{}", decl.namespace, decl.name);
    if !decl.supertypes.is_empty() {
        let _ = write!(line, " : {}", decl.supertypes.join(", "));
    }
    if let Some(role) = decl.role {
        let _ = write!(line, " [{}]", role);
    }
    let _ = write!(
        line,
        " ({}:{}-{})",
        decl.source_file, decl.start_line, decl.end_line
    );
    line
}

pub fn render_detail(
    name: &str,
    projects: &[Project],
    summary: &Summary,
    conventions: &Conventions,
    declaration_cap: usize,
) -> DetailContext {
    let mut text = String::new();

    let _ = writeln!(text, "# Architecture Detail: {}", name);
    let _ = writeln!(
        text,
        "Ecosystems: {}",
        if summary.ecosystems.is_empty() {
            "none".to_string()
        } else {
            summary.ecosystems.join(", ")
        }
    );
    let _ = writeln!(
        text,
        "Conventions: naming {}, private member prefix {}",
        conventions.naming_style,
        if conventions.private_member_prefix.is_empty() {
            "(none)"
        } else {
            conventions.private_member_prefix.as_str()
        }
    );
    if !summary.top_namespaces.is_empty() {
        let _ = writeln!(text, "Top namespaces: {}", summary.top_namespaces.join(", "));
    }

    if projects.is_empty() {
        text.push_str("\n## Projects\n");
        text.push_str(NONE_DETECTED);
        text.push('\n');
    }

    for project in projects {
        let _ = writeln!(text, "\n## Project: {}", project.name);
        let _ = writeln!(text, "Ecosystem: {}", project.ecosystem);
        let _ = writeln!(text, "Manifest: {}", project.manifest_path);
        let _ = writeln!(text, "Directory: {}", project.relative_dir);
        if let Some(target) = &project.target {
            let _ = writeln!(text, "Target: {}", target);
        }
        let _ = writeln!(text, "Root namespace: {}", project.root_namespace);
        let _ = writeln!(
            text,
            "Kind: {}",
            crate::architecture::ProjectKind::of(project).label()
        );

        let deps: Vec<String> = project
            .dependencies
            .iter()
            .map(|d| match &d.version {
                Some(v) => format!("{} {}", d.name, v),
                None => d.name.clone(),
            })
            .collect();
        let _ = writeln!(
            text,
            "Dependencies: {}",
            if deps.is_empty() {
                "none".to_string()
            } else {
                deps.join(", ")
            }
        );
        let _ = writeln!(text, "Namespaces: {}", project.namespaces.join(", "));

        let total = project.types.len() + project.interfaces.len();
        let listed: Vec<(DeclarationKind, &TypeInfo)> =
            project.declarations_by_kind().take(declaration_cap).collect();
        let shown = listed.len();
        for (kind, heading) in [
            (DeclarationKind::Type, "### Types\n"),
            (DeclarationKind::Interface, "### Interfaces\n"),
        ] {
            let mut decls = listed.iter().filter(|(k, _)| *k == kind).peekable();
            if decls.peek().is_some() {
                text.push_str(heading);
            }
            for (_, decl) in decls {
                text.push_str(&declaration_line(decl));
                text.push('\n');
            }
        }
        if shown < total {
            let _ = writeln!(text, "(showing {} of {} declarations)", shown, total);
        }
    }

    DetailContext {
        token_estimate: estimate_tokens(&text),
        text,
    }
}
