//! .NET projects (SDK-style and legacy `.csproj`)

use super::parsers::{cached_regex, DependencyList};
use super::{
    skip_balanced, split_top_level, Declaration, DeclarationKind, EcosystemAnalyzer, ManifestInfo,
    SourceFile,
};
use crate::model::Conventions;
use crate::span::{self, Syntax};
use anyhow::Context;
use regex::Regex;
use std::sync::OnceLock;

const TEST_FRAMEWORK_MARKERS: &[&str] = &[
    "using Xunit",
    "using NUnit",
    "using Microsoft.VisualStudio.TestTools",
    "[Fact]",
    "[Theory]",
    "[TestMethod]",
    "[TestFixture]",
];

pub struct DotNetAnalyzer;

fn type_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*(?:\[[^\]\n]*\][ \t]*)*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|unsafe|readonly|ref|file|new)\s+)*(class|struct|interface|enum|record(?:\s+class|\s+struct)?)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
}

fn namespace_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*namespace\s+([A-Za-z_][A-Za-z0-9_.]*)\s*([;{])?",
    )
}

fn where_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"\bwhere\b")
}

/// A namespace declaration and the byte range it covers.
struct NamespaceScope {
    name: String,
    start: usize,
    end: usize,
}

fn namespace_scopes(content: &str, masked: &str) -> Vec<NamespaceScope> {
    let Some(re) = namespace_regex() else {
        return Vec::new();
    };
    re.captures_iter(masked)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let end = match caps.get(2) {
                Some(open) if open.as_str() == "{" => {
                    span::matching_close_offset(content, open.start(), &Syntax::CSHARP)
                        .unwrap_or(content.len())
                }
                _ => content.len(),
            };
            Some(NamespaceScope {
                name: name.as_str().to_string(),
                start: name.start(),
                end,
            })
        })
        .collect()
}

/// Dotted namespace enclosing `offset`, nested block namespaces joined.
fn namespace_at(scopes: &[NamespaceScope], offset: usize) -> Option<String> {
    let names: Vec<&str> = scopes
        .iter()
        .filter(|s| s.start <= offset && offset < s.end)
        .map(|s| s.name.as_str())
        .collect();
    (!names.is_empty()).then(|| names.join("."))
}

/// `class A<T>(int x) : Base<T>, IFoo where T : new()` yields `[Base<T>, IFoo]`.
fn base_list(masked: &str, name_end: usize) -> Vec<String> {
    let rest = &masked[name_end..];
    let header_end = rest.find(&['{', ';'][..]).unwrap_or(rest.len());
    let mut header = rest[..header_end].trim_start();
    header = skip_balanced(header, '<', '>');
    header = skip_balanced(header, '(', ')');

    let Some(bases) = header.strip_prefix(':') else {
        return Vec::new();
    };
    let bases = match where_regex().and_then(|re| re.find(bases)) {
        Some(m) => &bases[..m.start()],
        None => bases,
    };
    split_top_level(bases, ',')
}

fn element_text<'a>(doc: &'a roxmltree::Document, tag: &str) -> Option<&'a str> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl EcosystemAnalyzer for DotNetAnalyzer {
    fn ecosystem_id(&self) -> &'static str {
        "dotnet"
    }

    fn manifest_priority(&self, file_name: &str) -> Option<u8> {
        file_name.ends_with(".csproj").then_some(0)
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["cs"]
    }

    fn excluded_dirs(&self) -> &[&'static str] {
        &["bin", "obj", ".vs", ".nuget"]
    }

    fn conventions(&self) -> Conventions {
        Conventions::new("PascalCase", "_")
    }

    /// The project name is `<AssemblyName>`, else the project file's stem.
    fn parse_manifest(&self, file_name: &str, content: &str) -> anyhow::Result<ManifestInfo> {
        let content = content.trim_start_matches('\u{feff}');
        let doc = roxmltree::Document::parse(content).context("invalid project XML")?;

        let name = element_text(&doc, "AssemblyName")
            .map(String::from)
            .or_else(|| file_name.strip_suffix(".csproj").map(String::from));
        let root_namespace = element_text(&doc, "RootNamespace").map(String::from);
        let target = element_text(&doc, "TargetFramework")
            .or_else(|| element_text(&doc, "TargetFrameworks"))
            .map(|t| {
                t.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            });

        let mut deps = DependencyList::new();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "PackageReference")
        {
            let Some(include) = node.attribute("Include") else {
                continue;
            };
            let version = node.attribute("Version").map(String::from).or_else(|| {
                node.children()
                    .find(|c| c.is_element() && c.tag_name().name() == "Version")
                    .and_then(|c| c.text())
                    .map(|t| t.trim().to_string())
            });
            deps.push(include, version);
        }

        Ok(ManifestInfo {
            name,
            root_namespace,
            target,
            dependencies: deps.into_vec(),
        })
    }

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration> {
        let Some(type_re) = type_regex() else {
            return Vec::new();
        };
        let content = &file.content;
        let masked = span::mask_noise(content, &Syntax::CSHARP);
        let scopes = namespace_scopes(content, &masked);

        let mut declarations = Vec::new();
        for caps in type_re.captures_iter(&masked) {
            let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let kind = if keyword.as_str() == "interface" {
                DeclarationKind::Interface
            } else {
                DeclarationKind::Type
            };
            let span = span::declaration_span_with(content, keyword.start(), &Syntax::CSHARP);

            declarations.push(
                Declaration::new(kind, name.as_str(), span)
                    .with_namespace(namespace_at(&scopes, keyword.start()))
                    .with_supertypes(base_list(&masked, name.end())),
            );
        }
        declarations
    }

    fn is_test_source(&self, file: &SourceFile) -> bool {
        let stem = file.stem();
        stem.ends_with("Tests")
            || stem.ends_with("Test")
            || TEST_FRAMEWORK_MARKERS
                .iter()
                .any(|marker| file.content.contains(marker))
    }
}
