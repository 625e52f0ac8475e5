//! The walk shared by every ecosystem: locate manifests, derive one project
//! per manifest directory, then attribute each source file to its nearest
//! enclosing project and scan it.

use super::{DeclarationKind, EcosystemAnalyzer, ManifestInfo, PartialAnalysis, SourceFile};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::model::{Project, TypeInfo};
use crate::patterns::{classify_role, Role};
use ignore::{DirEntry, WalkBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Directories pruned regardless of which analyzers are registered.
pub const ALWAYS_EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".idea", ".vscode"];

/// Walk settings shared by every analyzer of one registry.
#[derive(Debug, Clone)]
pub struct ScanContext {
    excluded_dirs: Arc<Vec<String>>,
    pub probe_depth: usize,
    pub max_depth: usize,
    pub max_file_size_bytes: u64,
    pub respect_gitignore: bool,
}

impl ScanContext {
    pub fn new<'a>(
        config: &AnalysisConfig,
        analyzer_excluded_dirs: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut excluded: Vec<String> = Vec::new();
        for dir in ALWAYS_EXCLUDED_DIRS {
            push_excluded(&mut excluded, dir);
        }
        for dir in analyzer_excluded_dirs {
            push_excluded(&mut excluded, dir);
        }
        for dir in &config.extra_excluded_dirs {
            push_excluded(&mut excluded, dir.trim());
        }

        Self {
            excluded_dirs: Arc::new(excluded),
            probe_depth: config.probe_depth,
            max_depth: config.max_depth,
            max_file_size_bytes: config.max_file_size_bytes,
            respect_gitignore: config.respect_gitignore,
        }
    }

    pub fn excluded_dirs(&self) -> &[String] {
        &self.excluded_dirs
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        is_excluded(&self.excluded_dirs, name)
    }

    fn walk(&self, root: &Path, max_depth: usize) -> impl Iterator<Item = DirEntry> {
        let excluded = Arc::clone(&self.excluded_dirs);
        WalkBuilder::new(root)
            .max_depth(Some(max_depth))
            .hidden(false)
            .parents(false)
            .git_global(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !is_excluded(&excluded, name))
                    .unwrap_or(true)
            })
            .build()
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
    }
}

fn push_excluded(excluded: &mut Vec<String>, dir: &str) {
    if !excluded.iter().any(|d| d == dir) {
        excluded.push(dir.to_string());
    }
}

fn is_excluded(excluded: &[String], name: &str) -> bool {
    excluded.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => pattern == name,
    })
}

/// `path` relative to `root` with `/` separators; `"."` for the root itself.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

fn read_manifest(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(source) => {
            let err = AnalysisError::FileRead {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "Manifest unreadable, continuing with directory name");
            None
        }
    }
}

pub fn probe<A>(analyzer: &A, root: &Path, ctx: &ScanContext) -> bool
where
    A: EcosystemAnalyzer + ?Sized,
{
    ctx.walk(root, ctx.probe_depth).any(|entry| {
        let file_name = file_name_of(entry.path());
        if analyzer.manifest_priority(file_name).is_none() {
            return false;
        }
        match std::fs::read_to_string(entry.path()) {
            Ok(content) => analyzer.qualifies(file_name, &content),
            Err(_) => true,
        }
    })
}

struct ManifestCandidate {
    path: PathBuf,
    priority: u8,
    content: Option<String>,
}

/// Picks the highest-priority qualifying manifest in every directory.
fn locate_manifests<A>(analyzer: &A, manifests: Vec<(PathBuf, u8)>) -> Vec<ManifestCandidate>
where
    A: EcosystemAnalyzer + ?Sized,
{
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut by_dir: HashMap<PathBuf, Vec<(PathBuf, u8)>> = HashMap::new();
    for (path, priority) in manifests {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !by_dir.contains_key(&dir) {
            dirs.push(dir.clone());
        }
        by_dir.entry(dir).or_default().push((path, priority));
    }

    // Component-wise order puts a directory before everything nested in it.
    dirs.sort();

    let mut chosen = Vec::new();
    for dir in dirs {
        let Some(mut candidates) = by_dir.remove(&dir) else {
            continue;
        };
        candidates.sort_by_key(|(_, priority)| *priority);
        for (path, priority) in candidates {
            let content = read_manifest(&path);
            let qualifies = content
                .as_deref()
                .map(|c| analyzer.qualifies(file_name_of(&path), c))
                .unwrap_or(true);
            if qualifies {
                chosen.push(ManifestCandidate {
                    path,
                    priority,
                    content,
                });
                break;
            }
        }
    }
    chosen
}

fn manifest_info<A>(analyzer: &A, candidate: &ManifestCandidate) -> ManifestInfo
where
    A: EcosystemAnalyzer + ?Sized,
{
    let Some(content) = candidate.content.as_deref() else {
        return ManifestInfo::default();
    };
    match analyzer.parse_manifest(file_name_of(&candidate.path), content) {
        Ok(info) => info,
        Err(e) => {
            let err = AnalysisError::ManifestParse {
                path: candidate.path.clone(),
                reason: format!("{:#}", e),
            };
            warn!(
                ecosystem = analyzer.ecosystem_id(),
                error = %err,
                "Malformed manifest, continuing with directory name and no dependencies"
            );
            ManifestInfo::default()
        }
    }
}

fn new_project<A>(
    analyzer: &A,
    root: &Path,
    candidate: &ManifestCandidate,
    info: ManifestInfo,
) -> Project
where
    A: EcosystemAnalyzer + ?Sized,
{
    let dir = candidate.path.parent().unwrap_or(root);
    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            let dir_name = file_name_of(dir);
            if dir_name.is_empty() {
                "root".to_string()
            } else {
                dir_name.to_string()
            }
        });
    let root_namespace = info
        .root_namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| name.clone());

    debug!(
        ecosystem = analyzer.ecosystem_id(),
        project = %name,
        manifest = %candidate.path.display(),
        priority = candidate.priority,
        dependencies = info.dependencies.len(),
        "Discovered project"
    );

    Project {
        name,
        manifest_path: relative_path(root, &candidate.path),
        relative_dir: relative_path(root, dir),
        ecosystem: analyzer.ecosystem_id().to_string(),
        target: info.target,
        root_namespace,
        dependencies: info.dependencies,
        types: Vec::new(),
        interfaces: Vec::new(),
        namespaces: Vec::new(),
        pattern_tags: Vec::new(),
    }
}

/// Index of the nearest project directory enclosing `path`.
fn owning_project(path: &Path, root: &Path, project_dirs: &HashMap<PathBuf, usize>) -> Option<usize> {
    let mut current = path.parent();
    while let Some(dir) = current {
        if let Some(index) = project_dirs.get(dir) {
            return Some(*index);
        }
        if dir == root {
            break;
        }
        current = dir.parent();
    }
    None
}

fn push_distinct<T: PartialEq + Clone>(items: &mut Vec<T>, item: &T) {
    if !items.contains(item) {
        items.push(item.clone());
    }
}

fn record_declarations<A>(analyzer: &A, project: &mut Project, file: &SourceFile)
where
    A: EcosystemAnalyzer + ?Sized,
{
    let in_test_file = analyzer.is_test_source(file);
    for decl in analyzer.scan_source(file) {
        let namespace = decl
            .namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| project.root_namespace.clone());
        let role = classify_role(&decl.name, in_test_file);
        let info = TypeInfo {
            name: decl.name,
            namespace,
            source_file: file.relative_path.clone(),
            supertypes: decl.supertypes,
            role,
            start_line: decl.start_line,
            end_line: decl.end_line,
        };

        push_distinct(&mut project.namespaces, &info.namespace);
        if let Some(role) = role {
            push_distinct::<Role>(&mut project.pattern_tags, &role);
        }
        match decl.kind {
            DeclarationKind::Type => project.types.push(info),
            DeclarationKind::Interface => project.interfaces.push(info),
        }
    }
}

pub fn analyze<A>(
    analyzer: &A,
    root: &Path,
    ctx: &ScanContext,
    cancel: &CancellationToken,
) -> Result<PartialAnalysis, AnalysisError>
where
    A: EcosystemAnalyzer + ?Sized,
{
    let start = Instant::now();
    let ecosystem = analyzer.ecosystem_id();
    let extensions = analyzer.source_extensions();

    let mut manifests: Vec<(PathBuf, u8)> = Vec::new();
    let mut sources: Vec<(PathBuf, u64)> = Vec::new();
    for entry in ctx.walk(root, ctx.max_depth) {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let path = entry.path();
        let file_name = file_name_of(path);
        if let Some(priority) = analyzer.manifest_priority(file_name) {
            manifests.push((path.to_path_buf(), priority));
            continue;
        }
        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e))
            .unwrap_or(false);
        if matches_extension {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            sources.push((path.to_path_buf(), size));
        }
    }

    let mut projects = Vec::new();
    let mut dir_paths: Vec<PathBuf> = Vec::new();
    let mut project_dirs: HashMap<PathBuf, usize> = HashMap::new();
    for candidate in locate_manifests(analyzer, manifests) {
        let info = manifest_info(analyzer, &candidate);
        let dir = candidate.path.parent().unwrap_or(root).to_path_buf();
        project_dirs.insert(dir.clone(), projects.len());
        dir_paths.push(dir);
        projects.push(new_project(analyzer, root, &candidate, info));
    }

    let mut files_scanned = 0usize;
    for (path, size) in sources {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let Some(index) = owning_project(&path, root, &project_dirs) else {
            continue;
        };
        if size > ctx.max_file_size_bytes {
            debug!(path = %path.display(), size, "Skipping oversized source file");
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => {
                let err = AnalysisError::FileRead {
                    path: path.clone(),
                    source,
                };
                warn!(ecosystem, error = %err, "Skipping unreadable source file");
                continue;
            }
        };

        let file = SourceFile {
            relative_path: relative_path(root, &path),
            project_path: relative_path(&dir_paths[index], &path),
            root_namespace: projects[index].root_namespace.clone(),
            content,
        };
        let project = &mut projects[index];
        trace!(ecosystem, file = %file.relative_path, "Scanning source file");
        record_declarations(analyzer, project, &file);
        files_scanned += 1;
    }

    for project in &mut projects {
        if project.namespaces.is_empty() {
            project.namespaces.push(project.root_namespace.clone());
        }
    }

    debug!(
        ecosystem,
        projects = projects.len(),
        files_scanned,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Ecosystem analysis completed"
    );

    Ok(PartialAnalysis {
        ecosystem,
        projects,
        conventions: analyzer.conventions(),
    })
}
