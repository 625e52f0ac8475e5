use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while analysing a source tree.
///
/// Only [`AnalysisError::RootNotFound`], [`AnalysisError::Cancelled`] and
/// [`AnalysisError::Config`] are returned to callers. The remaining variants
/// are logged where they occur and the affected manifest, file or analyzer
/// degrades to an empty contribution.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Root path does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Failed to read file {path}: {source}")]
    FileRead { path: PathBuf, source: io::Error },

    #[error("Analyzer '{ecosystem}' failed: {reason}")]
    AnalyzerFailure { ecosystem: String, reason: String },

    #[error("Analysis was cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Whether the error must abort the whole run rather than degrade locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::RootNotFound(_) | AnalysisError::Cancelled | AnalysisError::Config(_)
        )
    }
}
