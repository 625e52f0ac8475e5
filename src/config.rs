use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PROBE_DEPTH: usize = 4;
const DEFAULT_MAX_DEPTH: usize = 32;
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1MB
const DEFAULT_KEY_NAMESPACE_LIMIT: usize = 5;
const DEFAULT_DETAIL_DECLARATION_CAP: usize = 60;
const DEFAULT_TOP_NAMESPACE_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid excluded directory '{0}': must be a single non-empty directory name")]
    InvalidExcludedDir(String),
}

/// Tuning knobs for an analysis run.
///
/// The value is handed to [`crate::AnalyzerRegistry::new`] explicitly; nothing
/// here is read from the process environment. Hosts that keep settings in a
/// file can deserialize it; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory depth inspected by the cheap `can_analyze` probes.
    pub probe_depth: usize,
    /// Maximum walk depth when locating manifests and source files.
    pub max_depth: usize,
    /// Source files larger than this are skipped.
    pub max_file_size_bytes: u64,
    /// Namespaces listed per project in the lightweight view.
    pub key_namespace_limit: usize,
    /// Types plus interfaces listed per project in the detailed view.
    pub detail_declaration_cap: usize,
    /// Length of `Summary::top_namespaces`.
    pub top_namespace_limit: usize,
    pub respect_gitignore: bool,
    pub extra_excluded_dirs: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            probe_depth: DEFAULT_PROBE_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            key_namespace_limit: DEFAULT_KEY_NAMESPACE_LIMIT,
            detail_declaration_cap: DEFAULT_DETAIL_DECLARATION_CAP,
            top_namespace_limit: DEFAULT_TOP_NAMESPACE_LIMIT,
            respect_gitignore: true,
            extra_excluded_dirs: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=16).contains(&self.probe_depth) {
            return Err(ConfigError::ValidationFailed(
                "Probe depth must be between 1 and 16".to_string(),
            ));
        }
        if self.max_depth < self.probe_depth {
            return Err(ConfigError::ValidationFailed(
                "Max depth cannot be smaller than probe depth".to_string(),
            ));
        }
        if self.max_depth > 256 {
            return Err(ConfigError::ValidationFailed(
                "Max depth cannot exceed 256".to_string(),
            ));
        }

        if self.max_file_size_bytes < 1024 {
            return Err(ConfigError::ValidationFailed(
                "Max file size must be at least 1KB".to_string(),
            ));
        }

        if !(3..=5).contains(&self.key_namespace_limit) {
            return Err(ConfigError::ValidationFailed(
                "Key namespace limit must be between 3 and 5".to_string(),
            ));
        }
        if !(40..=80).contains(&self.detail_declaration_cap) {
            return Err(ConfigError::ValidationFailed(
                "Detail declaration cap must be between 40 and 80".to_string(),
            ));
        }
        if !(1..=50).contains(&self.top_namespace_limit) {
            return Err(ConfigError::ValidationFailed(
                "Top namespace limit must be between 1 and 50".to_string(),
            ));
        }

        for dir in &self.extra_excluded_dirs {
            let trimmed = dir.trim();
            if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') {
                return Err(ConfigError::InvalidExcludedDir(dir.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_depth, 4);
        assert_eq!(config.detail_declaration_cap, 60);
        assert!(config.respect_gitignore);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AnalysisConfig = toml::from_str(
            "max_file_size_bytes = 4096\nextra_excluded_dirs = [\"generated\"]\n",
        )
        .unwrap();
        assert_eq!(config.max_file_size_bytes, 4096);
        assert_eq!(config.extra_excluded_dirs, vec!["generated"]);
        assert_eq!(config.probe_depth, 4);
        assert!(config.respect_gitignore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_probe_depth_bounds() {
        let config = AnalysisConfig {
            probe_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        let config = AnalysisConfig {
            probe_depth: 8,
            max_depth: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detail_cap_bounds() {
        for cap in [39, 81] {
            let config = AnalysisConfig {
                detail_declaration_cap: cap,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "cap {} should be rejected", cap);
        }
        let config = AnalysisConfig {
            detail_declaration_cap: 80,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_namespace_limit_bounds() {
        let config = AnalysisConfig {
            key_namespace_limit: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_small_file_size_rejected() {
        let config = AnalysisConfig {
            max_file_size_bytes: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_excluded_dir() {
        let config = AnalysisConfig {
            extra_excluded_dirs: vec!["generated/out".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidExcludedDir("generated/out".to_string()))
        );

        let config = AnalysisConfig {
            extra_excluded_dirs: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            extra_excluded_dirs: vec!["generated".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
