//! Rust crates (Cargo)

use super::parsers::{cached_regex, DependencyList, TomlDependencyParser};
use super::{
    skip_balanced, split_top_level, Declaration, DeclarationKind, EcosystemAnalyzer, ManifestInfo,
    SourceFile,
};
use crate::model::Conventions;
use crate::span::{self, Syntax};
use anyhow::Context;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const DEPENDENCY_PARSER: TomlDependencyParser = TomlDependencyParser {
    dependencies_keys: &["dependencies", "dev-dependencies", "build-dependencies"],
    ignored_names: &[],
};

const TEST_CRATES: &[&str] = &["use rstest", "#[rstest", "use proptest", "proptest!"];

pub struct RustAnalyzer;

fn item_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*(?:pub(?:\s*\([^)]*\))?\s+)?(?:unsafe\s+)?(?:auto\s+)?(struct|enum|union|trait)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
}

fn impl_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*(?:unsafe\s+)?impl\b(?:\s*<[^{;]*?>)?\s+!?([A-Za-z_][A-Za-z0-9_:]*(?:\s*<[^{;]*?>)?)\s+for\s+(?:[A-Za-z_][A-Za-z0-9_]*::)*([A-Za-z_][A-Za-z0-9_]*)",
    )
}

/// Module path of a source file: `src/api/mod.rs` in crate `app` is `app::api`.
fn module_path(file: &SourceFile) -> String {
    let mut segments: Vec<&str> = file.dirs().collect();
    if segments.first() == Some(&"src") {
        segments.remove(0);
    }
    let stem = file.stem();
    let is_root_file = segments.is_empty() && matches!(stem, "lib" | "main");
    if stem != "mod" && !is_root_file {
        segments.push(stem);
    }

    let mut path = file.root_namespace.clone();
    for segment in segments {
        path.push_str("::");
        path.push_str(&segment.replace('-', "_"));
    }
    path
}

/// Traits implemented per type via `impl Trait for Type` in the same file.
fn implemented_traits(masked: &str) -> HashMap<String, Vec<String>> {
    let mut traits: HashMap<String, Vec<String>> = HashMap::new();
    let Some(re) = impl_regex() else {
        return traits;
    };
    for caps in re.captures_iter(masked) {
        let (Some(trait_name), Some(type_name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let trait_name = trait_name.as_str().split_whitespace().collect::<String>();
        let entry = traits.entry(type_name.as_str().to_string()).or_default();
        if !entry.contains(&trait_name) {
            entry.push(trait_name);
        }
    }
    traits
}

/// `trait A: B + C where ... {` yields `[B, C]`.
fn supertraits(masked: &str, name_end: usize) -> Vec<String> {
    let header_end = masked[name_end..]
        .find(&['{', ';'][..])
        .map(|p| name_end + p)
        .unwrap_or(masked.len());
    let header = skip_balanced(masked[name_end..header_end].trim_start(), '<', '>');

    let Some(bounds) = header.strip_prefix(':') else {
        return Vec::new();
    };
    let bounds = match bounds.find("where") {
        Some(idx) => &bounds[..idx],
        None => bounds,
    };
    split_top_level(bounds, '+')
}

impl EcosystemAnalyzer for RustAnalyzer {
    fn ecosystem_id(&self) -> &'static str {
        "rust"
    }

    fn manifest_priority(&self, file_name: &str) -> Option<u8> {
        (file_name == "Cargo.toml").then_some(0)
    }

    /// Virtual workspace manifests have no `[package]` and are not crates.
    fn qualifies(&self, _file_name: &str, content: &str) -> bool {
        match toml::from_str::<toml::Value>(content) {
            Ok(doc) => doc.get("package").is_some(),
            Err(_) => true,
        }
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["rs"]
    }

    fn excluded_dirs(&self) -> &[&'static str] {
        &["target", ".cargo"]
    }

    fn conventions(&self) -> Conventions {
        Conventions::new("snake_case", "")
    }

    fn parse_manifest(&self, _file_name: &str, content: &str) -> anyhow::Result<ManifestInfo> {
        let doc: toml::Value = toml::from_str(content).context("invalid Cargo.toml")?;
        let package = doc.get("package");
        let name = package
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(String::from);
        let target = package
            .and_then(|p| p.get("edition"))
            .and_then(|e| e.as_str())
            .map(|e| format!("edition {}", e));

        let mut deps = DependencyList::new();
        DEPENDENCY_PARSER.parse(&doc, &mut deps);

        Ok(ManifestInfo {
            root_namespace: name.as_ref().map(|n| n.replace('-', "_")),
            name,
            target,
            dependencies: deps.into_vec(),
        })
    }

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration> {
        let Some(item_re) = item_regex() else {
            return Vec::new();
        };
        let content = &file.content;
        let masked = span::mask_noise(content, &Syntax::RUST);
        let traits = implemented_traits(&masked);
        let namespace = module_path(file);

        let mut declarations = Vec::new();
        for caps in item_re.captures_iter(&masked) {
            let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let offset = whole.start() + whole.as_str().len() - whole.as_str().trim_start().len();
            let span = span::declaration_span_with(content, offset, &Syntax::RUST);

            let (kind, supertypes) = if keyword.as_str() == "trait" {
                (DeclarationKind::Interface, supertraits(&masked, name.end()))
            } else {
                (
                    DeclarationKind::Type,
                    traits.get(name.as_str()).cloned().unwrap_or_default(),
                )
            };

            declarations.push(
                Declaration::new(kind, name.as_str(), span)
                    .with_namespace(Some(namespace.clone()))
                    .with_supertypes(supertypes),
            );
        }
        declarations
    }

    fn is_test_source(&self, file: &SourceFile) -> bool {
        let name = file.file_name();
        file.in_dir_named("tests")
            || file.in_dir_named("benches")
            || name == "tests.rs"
            || name.ends_with("_test.rs")
            || name.ends_with("_tests.rs")
            || TEST_CRATES.iter().any(|marker| file.content.contains(marker))
    }
}
