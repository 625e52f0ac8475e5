//! Python packages (pyproject.toml, setup.py, requirements.txt)

use super::parsers::{
    cached_regex, parse_requirement, requirements_parser, DependencyList, TomlDependencyParser,
};
use super::{
    split_top_level, Declaration, DeclarationKind, EcosystemAnalyzer, ManifestInfo, SourceFile,
};
use crate::model::Conventions;
use crate::span::{self, Syntax};
use anyhow::Context;
use regex::Regex;
use std::sync::OnceLock;

const PYPROJECT_PARSER: TomlDependencyParser = TomlDependencyParser {
    dependencies_keys: &[
        "project.dependencies",
        "tool.poetry.dependencies",
        "tool.poetry.dev-dependencies",
        "tool.poetry.group.dev.dependencies",
    ],
    ignored_names: &["python"],
};

const INTERFACE_BASES: &[&str] = &["ABC", "Protocol", "Interface"];

const TEST_IMPORTS: &[&str] = &[
    "import pytest",
    "from pytest",
    "import unittest",
    "from unittest",
];

pub struct PythonAnalyzer;

fn class_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\]\s*)?(?:\(([^)]*)\))?\s*:",
    )
}

fn setup_field_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r#"\b(name|python_requires)\s*=\s*['"]([^'"]+)['"]"#,
    )
}

fn install_requires_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"install_requires\s*=\s*\[([^\]]*)\]")
}

fn quoted_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r#"['"]([^'"]+)['"]"#)
}

fn parse_pyproject(content: &str) -> anyhow::Result<ManifestInfo> {
    let doc: toml::Value = toml::from_str(content).context("invalid pyproject.toml")?;
    let project = doc.get("project");
    let poetry = doc.get("tool").and_then(|t| t.get("poetry"));

    let name = project
        .and_then(|p| p.get("name"))
        .or_else(|| poetry.and_then(|p| p.get("name")))
        .and_then(|n| n.as_str())
        .map(String::from);
    let target = project
        .and_then(|p| p.get("requires-python"))
        .or_else(|| {
            poetry
                .and_then(|p| p.get("dependencies"))
                .and_then(|d| d.get("python"))
        })
        .and_then(|v| v.as_str())
        .map(|v| format!("python {}", v));

    let mut deps = DependencyList::new();
    PYPROJECT_PARSER.parse(&doc, &mut deps);

    Ok(ManifestInfo {
        name,
        root_namespace: None,
        target,
        dependencies: deps.into_vec(),
    })
}

fn parse_setup_py(content: &str) -> ManifestInfo {
    let mut info = ManifestInfo::default();
    let masked = span::mask_noise(content, &Syntax::PYTHON);

    if let Some(re) = setup_field_regex() {
        for caps in re.captures_iter(content) {
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            // Matches inside comments or strings do not count.
            if masked[key.start()..key.end()].trim().is_empty() {
                continue;
            }
            match key.as_str() {
                "name" if info.name.is_none() => info.name = Some(value.as_str().to_string()),
                "python_requires" if info.target.is_none() => {
                    info.target = Some(format!("python {}", value.as_str()))
                }
                _ => {}
            }
        }
    }

    let mut deps = DependencyList::new();
    if let (Some(list_re), Some(quoted_re)) = (install_requires_regex(), quoted_regex()) {
        if let Some(list) = list_re.captures(content).and_then(|c| c.get(1)) {
            for quoted in quoted_re.captures_iter(list.as_str()) {
                let requirement = quoted.get(1).map(|m| m.as_str()).unwrap_or_default();
                if let Some((name, version)) = parse_requirement(requirement) {
                    deps.push(&name, version);
                }
            }
        }
    }
    info.dependencies = deps.into_vec();
    info
}

/// Dotted module of a file: `src/shop/api/__init__.py` is `shop.api`.
fn module_path(file: &SourceFile) -> Option<String> {
    let mut segments: Vec<&str> = file.dirs().collect();
    if segments.first() == Some(&"src") {
        segments.remove(0);
    }
    let stem = file.stem();
    if stem != "__init__" {
        segments.push(stem);
    }
    (!segments.is_empty()).then(|| segments.join("."))
}

fn is_interface_base(base: &str) -> bool {
    let compact: String = base.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(meta) = compact.strip_prefix("metaclass=") {
        return meta.rsplit('.').next() == Some("ABCMeta");
    }
    let head = compact.split('[').next().unwrap_or_default();
    let last = head.rsplit('.').next().unwrap_or_default();
    INTERFACE_BASES.contains(&last)
}

impl EcosystemAnalyzer for PythonAnalyzer {
    fn ecosystem_id(&self) -> &'static str {
        "python"
    }

    fn manifest_priority(&self, file_name: &str) -> Option<u8> {
        match file_name {
            "pyproject.toml" => Some(0),
            "setup.py" => Some(1),
            "requirements.txt" => Some(2),
            _ => None,
        }
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn excluded_dirs(&self) -> &[&'static str] {
        &[
            "__pycache__",
            ".venv",
            "venv",
            ".tox",
            ".nox",
            ".mypy_cache",
            ".pytest_cache",
            ".eggs",
            "*.egg-info",
            "site-packages",
            "build",
            "dist",
        ]
    }

    fn conventions(&self) -> Conventions {
        Conventions::new("snake_case", "_")
    }

    fn parse_manifest(&self, file_name: &str, content: &str) -> anyhow::Result<ManifestInfo> {
        let mut info = match file_name {
            "pyproject.toml" => parse_pyproject(content)?,
            "setup.py" => parse_setup_py(content),
            _ => {
                let mut deps = DependencyList::new();
                if let Some(parser) = requirements_parser() {
                    parser.parse(content, &mut deps);
                }
                ManifestInfo {
                    dependencies: deps.into_vec(),
                    ..Default::default()
                }
            }
        };
        info.root_namespace = info.name.as_ref().map(|n| n.replace('-', "_"));
        Ok(info)
    }

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration> {
        let Some(class_re) = class_regex() else {
            return Vec::new();
        };
        let content = &file.content;
        let masked = span::mask_noise(content, &Syntax::PYTHON);
        let namespace = module_path(file);

        let mut declarations = Vec::new();
        for caps in class_re.captures_iter(&masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let offset = whole.start() + whole.as_str().len() - whole.as_str().trim_start().len();
            let bases = caps
                .get(2)
                .map(|b| split_top_level(b.as_str(), ','))
                .unwrap_or_default();

            let kind = if bases.iter().any(|b| is_interface_base(b)) {
                DeclarationKind::Interface
            } else {
                DeclarationKind::Type
            };
            let supertypes = bases.into_iter().filter(|b| !b.contains('=')).collect();
            let span = span::indented_block_span(content, offset, &Syntax::PYTHON);

            declarations.push(
                Declaration::new(kind, name.as_str(), span)
                    .with_namespace(namespace.clone())
                    .with_supertypes(supertypes),
            );
        }
        declarations
    }

    fn is_test_source(&self, file: &SourceFile) -> bool {
        let name = file.file_name();
        name.starts_with("test_")
            || name.ends_with("_test.py")
            || name == "conftest.py"
            || TEST_IMPORTS.iter().any(|marker| file.content.contains(marker))
    }
}
