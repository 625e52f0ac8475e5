//! Go modules

use super::parsers::{cached_regex, DependencyList, RegexDependencyParser};
use super::{Declaration, DeclarationKind, EcosystemAnalyzer, ManifestInfo, SourceFile};
use crate::model::Conventions;
use crate::span::{self, Syntax};
use regex::Regex;
use std::sync::OnceLock;

pub struct GoAnalyzer;

fn require_line_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"^([^\s()]+)\s+(v[^\s]+)$")
}

fn type_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*type\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*\[[^\]\n]*\])?\s+(struct|interface)\s*\{",
    )
}

fn type_group_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"(?m)^[ \t]*type\s*\(")
}

fn group_entry_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"(?m)^[ \t]*([A-Za-z_][A-Za-z0-9_]*)(?:\s*\[[^\]\n]*\])?\s+(struct|interface)\s*\{",
    )
}

fn embedded_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"^\s*\*?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?(?:\[[^\]]*\])?)\s*$",
    )
}

/// Embedded types of a struct or interface body, one per line.
fn embedded_types(masked: &str, open: usize, close: usize) -> Vec<String> {
    let Some(re) = embedded_regex() else {
        return Vec::new();
    };
    masked[open + 1..close]
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

impl GoAnalyzer {
    fn declaration(
        &self,
        content: &str,
        masked: &str,
        namespace: &str,
        offset: usize,
        name: &str,
        keyword: &str,
    ) -> Declaration {
        let kind = if keyword == "interface" {
            DeclarationKind::Interface
        } else {
            DeclarationKind::Type
        };
        let body = span::body_open_offset(content, offset, &Syntax::GO).and_then(|open| {
            span::matching_close_offset(content, open, &Syntax::GO).map(|close| (open, close))
        });
        let start = span::line_of_offset(content, offset);
        let (end, supertypes) = match body {
            Some((open, close)) => (
                span::line_of_offset(content, close),
                embedded_types(masked, open, close),
            ),
            None => (start, Vec::new()),
        };

        Declaration::new(kind, name, (start, end))
            .with_namespace(Some(namespace.to_string()))
            .with_supertypes(supertypes)
    }
}

/// Import path of a file's package: module path plus its directory.
fn package_path(file: &SourceFile) -> String {
    let dirs: Vec<&str> = file.dirs().collect();
    if dirs.is_empty() {
        file.root_namespace.clone()
    } else {
        format!("{}/{}", file.root_namespace, dirs.join("/"))
    }
}

impl EcosystemAnalyzer for GoAnalyzer {
    fn ecosystem_id(&self) -> &'static str {
        "go"
    }

    fn manifest_priority(&self, file_name: &str) -> Option<u8> {
        (file_name == "go.mod").then_some(0)
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["go"]
    }

    fn excluded_dirs(&self) -> &[&'static str] {
        &["vendor", "testdata"]
    }

    fn conventions(&self) -> Conventions {
        Conventions::new("MixedCaps", "")
    }

    fn parse_manifest(&self, _file_name: &str, content: &str) -> anyhow::Result<ManifestInfo> {
        let mut module = None;
        let mut target = None;
        let mut deps = DependencyList::new();
        let parser = require_line_regex().map(|re| RegexDependencyParser {
            line_pattern: re,
            comment_prefix: "//",
        });

        let mut in_require_block = false;
        for raw in content.lines() {
            let line = raw.split("//").next().unwrap_or_default().trim();
            if in_require_block {
                if line.starts_with(')') {
                    in_require_block = false;
                } else if let Some(parser) = &parser {
                    parser.parse_line(line, &mut deps);
                }
                continue;
            }

            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some("module"), Some(path)) => module = Some(path.trim_matches('"').to_string()),
                (Some("go"), Some(version)) => target = Some(format!("go {}", version)),
                (Some("require"), Some("(")) => in_require_block = true,
                (Some("require"), Some(_)) => {
                    if let (Some(parser), Some(rest)) = (&parser, line.strip_prefix("require")) {
                        parser.parse_line(rest, &mut deps);
                    }
                }
                _ => {}
            }
        }

        let module = module.ok_or_else(|| anyhow::anyhow!("go.mod has no module directive"))?;
        let name = module.rsplit('/').next().unwrap_or(&module).to_string();

        Ok(ManifestInfo {
            name: Some(name),
            root_namespace: Some(module),
            target,
            dependencies: deps.into_vec(),
        })
    }

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration> {
        let content = &file.content;
        let masked = span::mask_noise(content, &Syntax::GO);
        let namespace = package_path(file);

        let mut found: Vec<(usize, Declaration)> = Vec::new();
        if let Some(re) = type_regex() {
            for caps in re.captures_iter(&masked) {
                let (Some(whole), Some(name), Some(keyword)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let offset =
                    whole.start() + whole.as_str().len() - whole.as_str().trim_start().len();
                found.push((
                    offset,
                    self.declaration(
                        content,
                        &masked,
                        &namespace,
                        offset,
                        name.as_str(),
                        keyword.as_str(),
                    ),
                ));
            }
        }

        if let (Some(group_re), Some(entry_re)) = (type_group_regex(), group_entry_regex()) {
            for group in group_re.find_iter(&masked) {
                let open = group.end() - 1;
                let Some(close) = span::matching_close_offset(content, open, &Syntax::GO) else {
                    continue;
                };
                let block = &masked[open + 1..close];
                let mut body_end = 0;
                for caps in entry_re.captures_iter(block) {
                    let (Some(name), Some(keyword)) = (caps.get(1), caps.get(2)) else {
                        continue;
                    };
                    let offset = open + 1 + name.start();
                    // Fields of an entry's body that look like declarations.
                    if offset < body_end {
                        continue;
                    }
                    body_end = span::body_open_offset(content, offset, &Syntax::GO)
                        .and_then(|o| span::matching_close_offset(content, o, &Syntax::GO))
                        .unwrap_or(offset);
                    found.push((
                        offset,
                        self.declaration(
                            content,
                            &masked,
                            &namespace,
                            offset,
                            name.as_str(),
                            keyword.as_str(),
                        ),
                    ));
                }
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, decl)| decl).collect()
    }

    fn is_test_source(&self, file: &SourceFile) -> bool {
        file.file_name().ends_with("_test.go") || file.content.contains("\"testing\"")
    }
}
