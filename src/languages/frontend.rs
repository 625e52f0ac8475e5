//! Frontend packages (`package.json` with a UI framework)

use super::parsers::{cached_regex, DependencyList, JsonDependencyParser};
use super::{
    skip_balanced, split_top_level, Declaration, DeclarationKind, EcosystemAnalyzer, ManifestInfo,
    SourceFile,
};
use crate::model::Conventions;
use crate::span::{self, Syntax};
use anyhow::Context;
use regex::Regex;
use std::sync::OnceLock;

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies", "peerDependencies"];

const DEPENDENCY_PARSER: JsonDependencyParser = JsonDependencyParser {
    dependencies_keys: DEPENDENCY_SECTIONS,
};

/// Dependencies that make a package a frontend project, in detection order.
const UI_FRAMEWORKS: &[&str] = &[
    "react",
    "react-dom",
    "vue",
    "@angular/core",
    "svelte",
    "solid-js",
    "preact",
    "next",
    "nuxt",
    "@sveltejs/kit",
];

const TEST_MARKERS: &[&str] = &[
    "from 'vitest'",
    "from \"vitest\"",
    "@testing-library/",
    "@jest/globals",
    "jest.mock(",
];

pub struct FrontendAnalyzer;

fn type_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*(?:(?:export|default|declare|abstract|const)\s+)*(class|interface|enum)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
    )
}

fn heritage_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"\b(?:extends|implements)\b")
}

fn function_component_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*export\s+(?:default\s+)?(?:async\s+)?function\s+([A-Z][A-Za-z0-9_]*)\s*(?:<[^(\n]*>)?\s*\(",
    )
}

fn arrow_component_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*export\s+(?:const|let)\s+([A-Z][A-Za-z0-9_]*)\s*(?::[^=\n]+)?=\s*(?:(?:React\.)?(?:memo|forwardRef)\(\s*)?(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=\n]+)?=>",
    )
}

/// `class A<T> extends Base<T> implements Foo, Bar {` yields `[Base<T>, Foo, Bar]`.
fn heritage(masked: &str, name_end: usize, body_open: Option<usize>) -> Vec<String> {
    let (Some(open), Some(re)) = (body_open, heritage_regex()) else {
        return Vec::new();
    };
    if open < name_end {
        return Vec::new();
    }
    let header = skip_balanced(masked[name_end..open].trim_start(), '<', '>');
    let clauses: Vec<_> = re.find_iter(header).collect();
    clauses
        .iter()
        .enumerate()
        .flat_map(|(i, clause)| {
            let end = clauses.get(i + 1).map_or(header.len(), |next| next.start());
            split_top_level(&header[clause.end()..end], ',')
        })
        .collect()
}

/// Span of an arrow function whose body starts after `arrow_end`: a block or
/// a parenthesised JSX expression, otherwise the declaration line.
fn arrow_span(content: &str, offset: usize, arrow_end: usize) -> (usize, usize) {
    let start = span::line_of_offset(content, offset);
    let body = content[arrow_end..]
        .find(|c: char| !c.is_whitespace())
        .map(|p| arrow_end + p)
        .filter(|&p| matches!(content.as_bytes()[p], b'{' | b'('));
    match body.and_then(|p| span::matching_close_offset(content, p, &Syntax::JAVASCRIPT)) {
        Some(close) => (start, span::line_of_offset(content, close)),
        None => (start, start),
    }
}

/// Span of a function whose parameter list opens at `params_open`.
fn function_span(content: &str, offset: usize, params_open: usize) -> (usize, usize) {
    let start = span::line_of_offset(content, offset);
    let close = span::matching_close_offset(content, params_open, &Syntax::JAVASCRIPT)
        .and_then(|params_close| {
            span::body_open_offset(content, params_close + 1, &Syntax::JAVASCRIPT)
        })
        .and_then(|open| span::matching_close_offset(content, open, &Syntax::JAVASCRIPT));
    match close {
        Some(close) => (start, span::line_of_offset(content, close)),
        None => (start, start),
    }
}

/// Directory of the file below the package root, without a leading `src`.
fn directory_namespace(file: &SourceFile) -> Option<String> {
    let mut dirs: Vec<&str> = file.dirs().collect();
    if dirs.first() == Some(&"src") {
        dirs.remove(0);
    }
    (!dirs.is_empty()).then(|| dirs.join("/"))
}

fn declares_framework(document: &serde_json::Value) -> bool {
    detected_framework(document).is_some()
}

/// First UI framework declared in any dependency section, with its version.
fn detected_framework(document: &serde_json::Value) -> Option<String> {
    UI_FRAMEWORKS.iter().find_map(|framework| {
        DEPENDENCY_SECTIONS.iter().find_map(|section| {
            let version = document.get(section)?.get(framework)?;
            Some(match version.as_str() {
                Some(v) if !v.is_empty() => format!("{} {}", framework, v),
                _ => framework.to_string(),
            })
        })
    })
}

impl FrontendAnalyzer {
    fn scan_components(&self, file: &SourceFile, masked: &str) -> Vec<(usize, Declaration)> {
        let content = &file.content;
        let mut found = Vec::new();

        if let Some(re) = function_component_regex() {
            for caps in re.captures_iter(masked) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let offset = name.start();
                let span = function_span(content, offset, whole.end() - 1);
                found.push((offset, Declaration::new(DeclarationKind::Type, name.as_str(), span)));
            }
        }

        if let Some(re) = arrow_component_regex() {
            for caps in re.captures_iter(masked) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let offset = name.start();
                let span = arrow_span(content, offset, whole.end());
                found.push((offset, Declaration::new(DeclarationKind::Type, name.as_str(), span)));
            }
        }

        found
    }
}

impl EcosystemAnalyzer for FrontendAnalyzer {
    fn ecosystem_id(&self) -> &'static str {
        "frontend"
    }

    fn manifest_priority(&self, file_name: &str) -> Option<u8> {
        (file_name == "package.json").then_some(0)
    }

    /// Plain Node packages and unreadable JSON are not frontend projects.
    fn qualifies(&self, _file_name: &str, content: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(content)
            .map(|doc| declares_framework(&doc))
            .unwrap_or(false)
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["ts", "tsx", "js", "jsx", "vue", "svelte"]
    }

    fn excluded_dirs(&self) -> &[&'static str] {
        &[
            "node_modules",
            "dist",
            "build",
            ".next",
            ".nuxt",
            "coverage",
            ".svelte-kit",
            "out",
        ]
    }

    fn conventions(&self) -> Conventions {
        Conventions::new("camelCase", "#")
    }

    fn parse_manifest(&self, _file_name: &str, content: &str) -> anyhow::Result<ManifestInfo> {
        let doc: serde_json::Value =
            serde_json::from_str(content).context("invalid package.json")?;
        let name = doc
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .map(String::from);

        let mut deps = DependencyList::new();
        DEPENDENCY_PARSER.parse(&doc, &mut deps);

        Ok(ManifestInfo {
            root_namespace: name.clone(),
            name,
            target: detected_framework(&doc),
            dependencies: deps.into_vec(),
        })
    }

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration> {
        let namespace = directory_namespace(file);
        let content = &file.content;

        if matches!(file.extension(), Some("vue") | Some("svelte")) {
            let span = (1, span::last_line(content));
            return vec![Declaration::new(DeclarationKind::Type, file.stem(), span)
                .with_namespace(namespace)];
        }

        let masked = span::mask_noise(content, &Syntax::JAVASCRIPT);
        let mut found: Vec<(usize, Declaration)> = Vec::new();

        if let Some(re) = type_regex() {
            for caps in re.captures_iter(&masked) {
                let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let offset = keyword.start();
                let body_open = span::body_open_offset(content, offset, &Syntax::JAVASCRIPT);
                let span = span::declaration_span_with(content, offset, &Syntax::JAVASCRIPT);
                let kind = match keyword.as_str() {
                    "interface" => DeclarationKind::Interface,
                    _ => DeclarationKind::Type,
                };
                let supertypes = match keyword.as_str() {
                    "enum" => Vec::new(),
                    _ => heritage(&masked, name.end(), body_open),
                };
                found.push((
                    offset,
                    Declaration::new(kind, name.as_str(), span).with_supertypes(supertypes),
                ));
            }
        }

        if matches!(file.extension(), Some("jsx") | Some("tsx")) {
            found.extend(self.scan_components(file, &masked));
        }

        found.sort_by_key(|(offset, _)| *offset);
        found
            .into_iter()
            .map(|(_, decl)| decl.with_namespace(namespace.clone()))
            .collect()
    }

    fn is_test_source(&self, file: &SourceFile) -> bool {
        let name = file.file_name();
        name.contains(".test.")
            || name.contains(".spec.")
            || file.in_dir_named("__tests__")
            || TEST_MARKERS.iter().any(|marker| file.content.contains(marker))
    }
}
