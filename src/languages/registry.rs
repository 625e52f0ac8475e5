use super::{
    DotNetAnalyzer, EcosystemAnalyzer, FrontendAnalyzer, GoAnalyzer, PartialAnalysis,
    PythonAnalyzer, RustAnalyzer, ScanContext,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::model::{AggregateAnalysis, Conventions};
use futures_util::future::join_all;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one analyzer produced: `Ok(None)` when its probe declined the root,
/// `Err` with the panic message when it panicked.
type RunOutcome = Result<Result<Option<PartialAnalysis>, AnalysisError>, String>;

/// Ordered set of ecosystem analyzers plus the configuration they run with.
///
/// Registration order is the merge order of the aggregate's project list.
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn EcosystemAnalyzer>>,
    config: AnalysisConfig,
}

impl AnalyzerRegistry {
    /// Empty registry; fails when `config` does not validate.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            analyzers: Vec::new(),
            config,
        })
    }

    /// Registry with every built-in ecosystem.
    pub fn with_defaults(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let mut registry = Self::new(config)?;
        registry.register(Arc::new(RustAnalyzer));
        registry.register(Arc::new(DotNetAnalyzer));
        registry.register(Arc::new(PythonAnalyzer));
        registry.register(Arc::new(GoAnalyzer));
        registry.register(Arc::new(FrontendAnalyzer));
        Ok(registry)
    }

    pub fn register(&mut self, analyzer: Arc<dyn EcosystemAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Registered ecosystem ids in registration order.
    pub fn ecosystems(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.ecosystem_id()).collect()
    }

    /// Walk settings for one analyzer: its own excluded directories plus the
    /// always-excluded and configured ones.
    pub fn scan_context(&self, analyzer: &dyn EcosystemAnalyzer) -> ScanContext {
        ScanContext::new(&self.config, analyzer.excluded_dirs().iter().copied())
    }

    /// Runs every applicable analyzer over `root` and merges their projects.
    ///
    /// Analyzers run concurrently on the blocking pool. A failing or
    /// panicking analyzer contributes no projects; cancellation discards all
    /// partial work.
    pub async fn analyze(
        &self,
        root: &Path,
        display_name: &str,
        cancel: &CancellationToken,
    ) -> Result<AggregateAnalysis, AnalysisError> {
        let started = Instant::now();
        let root = resolve_root(root)?;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        info!(
            root = %root.display(),
            analyzers = self.analyzers.len(),
            "Starting analysis"
        );

        let tasks = self.analyzers.iter().map(|analyzer| {
            let ctx = self.scan_context(analyzer.as_ref());
            let analyzer = Arc::clone(analyzer);
            let root = root.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                run_analyzer(analyzer.as_ref(), &root, &ctx, &cancel)
            })
        });
        let outcomes: Vec<RunOutcome> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|e| {
                    if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    }
                })
            })
            .collect();

        self.merge(&root, display_name, outcomes, cancel, started)
    }

    /// Synchronous variant of [`AnalyzerRegistry::analyze`] for hosts without
    /// a runtime; analyzers run on scoped threads.
    pub fn analyze_blocking(
        &self,
        root: &Path,
        display_name: &str,
        cancel: &CancellationToken,
    ) -> Result<AggregateAnalysis, AnalysisError> {
        let started = Instant::now();
        let root = resolve_root(root)?;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        info!(
            root = %root.display(),
            analyzers = self.analyzers.len(),
            "Starting analysis"
        );

        let outcomes: Vec<RunOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .analyzers
                .iter()
                .map(|analyzer| {
                    let ctx = self.scan_context(analyzer.as_ref());
                    let root = &root;
                    scope.spawn(move || run_analyzer(analyzer.as_ref(), root, &ctx, cancel))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().map_err(panic_message))
                .collect()
        });

        self.merge(&root, display_name, outcomes, cancel, started)
    }

    /// The single join point: concatenates projects in registration order.
    fn merge(
        &self,
        root: &Path,
        display_name: &str,
        outcomes: Vec<RunOutcome>,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<AggregateAnalysis, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let mut projects = Vec::new();
        let mut conventions: Option<Conventions> = None;
        for (analyzer, outcome) in self.analyzers.iter().zip(outcomes) {
            let ecosystem = analyzer.ecosystem_id();
            let reason = match outcome {
                Ok(Ok(Some(partial))) => {
                    if conventions.is_none() && !partial.projects.is_empty() {
                        conventions = Some(partial.conventions);
                    }
                    projects.extend(partial.projects);
                    continue;
                }
                Ok(Ok(None)) => {
                    debug!(ecosystem, "Analyzer not applicable");
                    continue;
                }
                Ok(Err(e)) if e.is_fatal() => return Err(e),
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic),
            };
            let failure = AnalysisError::AnalyzerFailure {
                ecosystem: ecosystem.to_string(),
                reason,
            };
            warn!(ecosystem, error = %failure, "Analyzer failed, continuing without its projects");
        }

        info!(
            projects = projects.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );

        Ok(AggregateAnalysis::new(
            display_name,
            root,
            projects,
            conventions.unwrap_or_default(),
            &self.config,
        ))
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::RootNotFound(root.to_path_buf()));
    }
    root.canonicalize()
        .map_err(|_| AnalysisError::RootNotFound(root.to_path_buf()))
}

fn run_analyzer(
    analyzer: &dyn EcosystemAnalyzer,
    root: &Path,
    ctx: &ScanContext,
    cancel: &CancellationToken,
) -> Result<Option<PartialAnalysis>, AnalysisError> {
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    if !analyzer.can_analyze(root, ctx) {
        return Ok(None);
    }
    analyzer.analyze(root, ctx, cancel).map(Some)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
