//! Top-level Strand configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{BuildConfig, DeadCodeConfig, IndexConfig, ResolutionConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`STRAND_*`)
/// 3. Project config (`strand.toml` in project root)
/// 4. User config (`~/.strand/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrandConfig {
    pub build: BuildConfig,
    pub index: IndexConfig,
    pub resolution: ResolutionConfig,
    pub dead_code: DeadCodeConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub shard_dir: Option<PathBuf>,
    pub memory_budget_bytes: Option<u64>,
}

impl StrandConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // User config. Only a parse failure is fatal here.
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        let project_config_path = root.join("strand.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &StrandConfig) -> Result<(), ConfigError> {
        let confidences = [
            (
                "resolution.same_scope_confidence",
                config.resolution.same_scope_confidence,
            ),
            ("resolution.import_confidence", config.resolution.import_confidence),
            ("resolution.unique_confidence", config.resolution.unique_confidence),
            (
                "resolution.low_resolution_warning",
                config.resolution.low_resolution_warning,
            ),
            (
                "dead_code.low_resolution_threshold",
                config.dead_code.low_resolution_threshold,
            ),
        ];
        for (field, value) in confidences {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: "must be between 0.0 and 1.0".to_string(),
                    });
                }
            }
        }
        if config.index.memory_budget_bytes == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "index.memory_budget_bytes".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.build.queue_depth == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "build.queue_depth".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        for pattern in &config.dead_code.allow_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::ValidationFailed {
                    field: "dead_code.allow_patterns".to_string(),
                    message: format!("invalid pattern `{pattern}`: {e}"),
                });
            }
        }
        Ok(())
    }

    /// Returns the user config path: `~/.strand/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".strand").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut StrandConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: StrandConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut StrandConfig, other: &StrandConfig) {
        // Build
        if other.build.workers.is_some() {
            base.build.workers = other.build.workers;
        }
        if other.build.queue_depth.is_some() {
            base.build.queue_depth = other.build.queue_depth;
        }
        if other.build.shard_dir.is_some() {
            base.build.shard_dir = other.build.shard_dir.clone();
        }

        // Index
        if other.index.memory_budget_bytes.is_some() {
            base.index.memory_budget_bytes = other.index.memory_budget_bytes;
        }
        if other.index.lookup_cache_entries.is_some() {
            base.index.lookup_cache_entries = other.index.lookup_cache_entries;
        }
        if other.index.persist.is_some() {
            base.index.persist = other.index.persist;
        }

        // Resolution
        if other.resolution.same_scope_confidence.is_some() {
            base.resolution.same_scope_confidence = other.resolution.same_scope_confidence;
        }
        if other.resolution.import_confidence.is_some() {
            base.resolution.import_confidence = other.resolution.import_confidence;
        }
        if other.resolution.unique_confidence.is_some() {
            base.resolution.unique_confidence = other.resolution.unique_confidence;
        }
        if other.resolution.low_resolution_warning.is_some() {
            base.resolution.low_resolution_warning = other.resolution.low_resolution_warning;
        }

        // Dead code
        if !other.dead_code.allow_patterns.is_empty() {
            base.dead_code.allow_patterns = other.dead_code.allow_patterns.clone();
        }
        if other.dead_code.low_resolution_threshold.is_some() {
            base.dead_code.low_resolution_threshold = other.dead_code.low_resolution_threshold;
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `STRAND_BUILD_WORKERS`, `STRAND_INDEX_MEMORY_BUDGET`, etc.
    fn apply_env_overrides(config: &mut StrandConfig) {
        if let Some(v) = env_parse::<usize>("STRAND_BUILD_WORKERS") {
            config.build.workers = Some(v);
        }
        if let Ok(val) = std::env::var("STRAND_SHARD_DIR") {
            config.build.shard_dir = Some(PathBuf::from(val));
        }
        if let Some(v) = env_parse::<u64>("STRAND_INDEX_MEMORY_BUDGET") {
            config.index.memory_budget_bytes = Some(v);
        }
        if let Some(v) = env_parse::<bool>("STRAND_INDEX_PERSIST") {
            config.index.persist = Some(v);
        }
        if let Some(v) = env_parse::<f64>("STRAND_RESOLUTION_SAME_SCOPE_CONFIDENCE") {
            config.resolution.same_scope_confidence = Some(v);
        }
        if let Some(v) = env_parse::<f64>("STRAND_RESOLUTION_IMPORT_CONFIDENCE") {
            config.resolution.import_confidence = Some(v);
        }
        if let Some(v) = env_parse::<f64>("STRAND_RESOLUTION_UNIQUE_CONFIDENCE") {
            config.resolution.unique_confidence = Some(v);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut StrandConfig, cli: &CliOverrides) {
        if let Some(v) = cli.workers {
            config.build.workers = Some(v);
        }
        if let Some(ref v) = cli.shard_dir {
            config.build.shard_dir = Some(v.clone());
        }
        if let Some(v) = cli.memory_budget_bytes {
            config.index.memory_budget_bytes = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
