//! Manifest dependency parsers shared by the ecosystem analyzers.

use crate::model::DependencyReference;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Ordered dependency list where the first declaration of a name wins.
#[derive(Debug, Default)]
pub struct DependencyList {
    dependencies: Vec<DependencyReference>,
    seen: HashSet<String>,
}

impl DependencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `name` was already declared.
    pub fn push(&mut self, name: &str, version: Option<String>) -> bool {
        let name = name.trim();
        if name.is_empty() || self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.dependencies
            .push(DependencyReference::new(name, version.filter(|v| !v.is_empty())));
        true
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn into_vec(self) -> Vec<DependencyReference> {
        self.dependencies
    }
}

/// Reads dependency tables such as `[dependencies]` or
/// `[tool.poetry.dependencies]`. Keys are dotted paths into the document.
pub struct TomlDependencyParser {
    pub dependencies_keys: &'static [&'static str],
    /// Entries that are not packages, like poetry's `python` constraint.
    pub ignored_names: &'static [&'static str],
}

impl TomlDependencyParser {
    pub fn parse(&self, document: &toml::Value, deps: &mut DependencyList) {
        for key in self.dependencies_keys {
            let Some(section) = lookup_toml(document, key) else {
                continue;
            };

            if let Some(table) = section.as_table() {
                for (name, value) in table {
                    if self.ignored_names.contains(&name.as_str()) {
                        continue;
                    }
                    deps.push(name, toml_version(value));
                }
            } else if let Some(items) = section.as_array() {
                for requirement in items.iter().filter_map(|v| v.as_str()) {
                    if let Some((name, version)) = parse_requirement(requirement) {
                        deps.push(&name, version);
                    }
                }
            }
        }
    }
}

fn lookup_toml<'a>(document: &'a toml::Value, dotted_key: &str) -> Option<&'a toml::Value> {
    dotted_key
        .split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

/// `"1.0"` and `{ version = "1.0", ... }` both carry a version; path and git
/// dependencies without one yield `None`.
fn toml_version(value: &toml::Value) -> Option<String> {
    if let Some(version) = value.as_str() {
        return Some(version.to_string());
    }
    let table = value.as_table()?;
    if let Some(version) = table.get("version").and_then(|v| v.as_str()) {
        return Some(version.to_string());
    }
    if table.get("workspace").and_then(|v| v.as_bool()) == Some(true) {
        return Some("workspace".to_string());
    }
    None
}

/// Reads `{ "name": "version" }` objects such as package.json's `dependencies`.
pub struct JsonDependencyParser {
    pub dependencies_keys: &'static [&'static str],
}

impl JsonDependencyParser {
    pub fn parse(&self, document: &serde_json::Value, deps: &mut DependencyList) {
        for key in self.dependencies_keys {
            if let Some(section) = document.get(key).and_then(|v| v.as_object()) {
                for (name, version) in section {
                    deps.push(name, version.as_str().map(String::from));
                }
            }
        }
    }
}

/// One dependency per matching line; group 1 is the name, group 2 the
/// optional version.
pub struct RegexDependencyParser {
    pub line_pattern: &'static Regex,
    pub comment_prefix: &'static str,
}

impl RegexDependencyParser {
    pub fn parse_line(&self, line: &str, deps: &mut DependencyList) {
        let line = strip_comment(line, self.comment_prefix).trim();
        if line.is_empty() {
            return;
        }
        if let Some(caps) = self.line_pattern.captures(line) {
            if let Some(name) = caps.get(1) {
                let version = caps.get(2).map(|m| m.as_str().trim().to_string());
                deps.push(name.as_str(), version);
            }
        }
    }

    pub fn parse(&self, content: &str, deps: &mut DependencyList) {
        for line in content.lines() {
            self.parse_line(line, deps);
        }
    }
}

fn strip_comment<'a>(line: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return line;
    }
    match line.find(prefix) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Compiles `pattern` once; `None` only if the literal pattern is invalid.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn requirement_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*((?:===|==|!=|<=|>=|~=|<|>)\s*[^;\s,]+(?:\s*,\s*(?:===|==|!=|<=|>=|~=|<|>)\s*[^;\s,]+)*)?",
    )
}

/// Parser for pip requirement lines (`requests[security]>=2.31,<3 ; python_version>"3.8"`).
pub fn requirements_parser() -> Option<RegexDependencyParser> {
    Some(RegexDependencyParser {
        line_pattern: requirement_regex()?,
        comment_prefix: "#",
    })
}

/// Splits one PEP 508 requirement into name and version specifier.
pub fn parse_requirement(requirement: &str) -> Option<(String, Option<String>)> {
    let caps = requirement_regex()?.captures(requirement.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let version = caps.get(2).map(|m| m.as_str().replace(' ', ""));
    Some((name, version))
}
