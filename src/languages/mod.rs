//! Ecosystem analyzers and the registry that dispatches them.
//!
//! Every ecosystem implements [`EcosystemAnalyzer`]. The trait's provided
//! `can_analyze`/`analyze` methods run the shared walk in [`scan`]; an
//! ecosystem only describes its manifests, its declaration grammar and its
//! test-file conventions.

mod dotnet;
mod frontend;
mod go;
pub mod parsers;
mod python;
mod registry;
mod rust;
pub mod scan;

pub use dotnet::DotNetAnalyzer;
pub use frontend::FrontendAnalyzer;
pub use go::GoAnalyzer;
pub use python::PythonAnalyzer;
pub use registry::AnalyzerRegistry;
pub use rust::RustAnalyzer;
pub use scan::ScanContext;

use crate::error::AnalysisError;
use crate::model::{Conventions, DependencyReference, Project};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Identity and dependencies read from one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestInfo {
    /// Declared project name; the manifest's directory name is used when absent.
    pub name: Option<String>,
    pub root_namespace: Option<String>,
    pub target: Option<String>,
    pub dependencies: Vec<DependencyReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Type,
    Interface,
}

/// A type or interface declaration found by an ecosystem's source scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Declared or path-derived namespace; `None` falls back to the project's
    /// root namespace.
    pub namespace: Option<String>,
    pub supertypes: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, name: impl Into<String>, span: (usize, usize)) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
            supertypes: Vec::new(),
            start_line: span.0,
            end_line: span.1,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_supertypes(mut self, supertypes: Vec<String>) -> Self {
        self.supertypes = supertypes;
        self
    }
}

/// A source file handed to an ecosystem scanner.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the analysis root, `/`-separated.
    pub relative_path: String,
    /// Path relative to the owning project's directory, `/`-separated.
    pub project_path: String,
    /// Root namespace of the owning project.
    pub root_namespace: String,
    pub content: String,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.project_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.project_path)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Directory components between the project root and the file.
    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        let mut parts: Vec<&str> = self.project_path.split('/').collect();
        parts.pop();
        parts.into_iter()
    }

    pub fn in_dir_named(&self, name: &str) -> bool {
        self.dirs().any(|d| d == name)
    }
}

/// Splits `list` at `separator` outside of `<>`, `()` and `[]`, trimming each
/// entry and dropping empty ones.
pub(crate) fn split_top_level(list: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut previous = ' ';
    for c in list.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' if previous == '-' || previous == '=' => {}
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        previous = c;
        if c == separator && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Drops a leading `open`..`close` group (generic parameters, a primary
/// constructor) from `header`. An unterminated group consumes everything.
pub(crate) fn skip_balanced(header: &str, open: char, close: char) -> &str {
    if !header.starts_with(open) {
        return header;
    }
    let mut depth = 0usize;
    for (i, c) in header.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return header[i + 1..].trim_start();
            }
        }
    }
    ""
}

/// Projects discovered by one analyzer, before merging.
#[derive(Debug, Clone)]
pub struct PartialAnalysis {
    pub ecosystem: &'static str,
    pub projects: Vec<Project>,
    pub conventions: Conventions,
}

/// Strategy for one ecosystem.
pub trait EcosystemAnalyzer: Send + Sync {
    /// Tag stored on every project this analyzer produces (e.g. `"rust"`).
    fn ecosystem_id(&self) -> &'static str;

    /// Priority of `file_name` as a manifest of this ecosystem, lower wins when
    /// one directory holds several. `None` when it is not a manifest.
    fn manifest_priority(&self, file_name: &str) -> Option<u8>;

    /// Whether a manifest's content makes it a project of this ecosystem.
    fn qualifies(&self, _file_name: &str, _content: &str) -> bool {
        true
    }

    fn source_extensions(&self) -> &[&'static str];

    /// Directory names that never contribute projects or declarations.
    fn excluded_dirs(&self) -> &[&'static str];

    fn conventions(&self) -> Conventions;

    fn parse_manifest(&self, file_name: &str, content: &str) -> anyhow::Result<ManifestInfo>;

    fn scan_source(&self, file: &SourceFile) -> Vec<Declaration>;

    fn is_test_source(&self, file: &SourceFile) -> bool;

    /// Cheap probe: a qualifying manifest exists within the probe depth.
    fn can_analyze(&self, root: &Path, ctx: &ScanContext) -> bool {
        scan::probe(self, root, ctx)
    }

    fn analyze(
        &self,
        root: &Path,
        ctx: &ScanContext,
        cancel: &CancellationToken,
    ) -> Result<PartialAnalysis, AnalysisError> {
        scan::analyze(self, root, ctx, cancel)
    }
}
