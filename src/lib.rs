//! archscan - static architecture analysis of multi-ecosystem source trees
//!
//! Given a root directory, archscan discovers the projects it contains
//! (Cargo crates, .NET projects, Python packages, Go modules and frontend
//! packages), parses their manifests and scans their sources for type and
//! interface declarations. The result is an immutable [`AggregateAnalysis`]
//! holding the project model, a summary, the dominant naming conventions and
//! two deterministic text renderings: a lightweight architecture summary and
//! a capped detailed listing, each with a token estimate.
//!
//! # Example
//!
//! ```no_run
//! use archscan::{AnalysisConfig, AnalyzerRegistry};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), archscan::AnalysisError> {
//! let registry = AnalyzerRegistry::with_defaults(AnalysisConfig::default())?;
//! let analysis = registry
//!     .analyze(Path::new("/repos/shop"), "shop", &CancellationToken::new())
//!     .await?;
//!
//! println!("{}", analysis.summary_text());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`languages`]: the ecosystem strategy trait, the shared walk and the registry
//! - [`model`]: the aggregate and its parts
//! - [`architecture`] and [`render`]: inference and the two text views
//! - [`span`]: declaration spans and comment/string masking

pub mod architecture;
pub mod config;
pub mod error;
pub mod languages;
pub mod model;
pub mod patterns;
pub mod render;
pub mod span;
pub mod util;

// Re-export key types for convenient access
pub use config::{AnalysisConfig, ConfigError};
pub use error::AnalysisError;
pub use languages::{AnalyzerRegistry, EcosystemAnalyzer, ScanContext};
pub use model::{
    AggregateAnalysis, Conventions, DependencyReference, ExtensionPoint, InterfaceInfo, Project,
    Summary, TypeInfo,
};
pub use patterns::{Layer, Role};
pub use util::{init_default, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
