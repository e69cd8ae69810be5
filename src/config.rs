//! Run configuration.
//!
//! Everything tunable lives here and is handed to components at construction:
//! stage thresholds, result window, query budget, audio extensions, rate limit
//! and the catalog endpoint. A TOML file may override any subset of fields;
//! CLI flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::QueryStage;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Resolver
// ============================================================================

/// Thresholds and limits for one file's staged resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Early-exit score after stage 1
    pub stage1_threshold: f64,
    /// Early-exit score after stage 2
    pub stage2_threshold: f64,
    /// Minimum acceptable score after stage 3
    pub min_threshold: f64,
    /// Candidates requested per query
    pub result_limit: usize,
    /// Cap on remote calls per file (None = no cap)
    pub max_queries: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            stage1_threshold: 0.85,
            stage2_threshold: 0.75,
            min_threshold: 0.65,
            result_limit: 5,
            max_queries: Some(12),
        }
    }
}

impl ResolverConfig {
    /// Acceptance score for a stage.
    pub fn threshold(&self, stage: QueryStage) -> f64 {
        match stage {
            QueryStage::HighPrecision => self.stage1_threshold,
            QueryStage::PrimaryAlternatives => self.stage2_threshold,
            QueryStage::Fallback => self.min_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("stage1_threshold", self.stage1_threshold),
            ("stage2_threshold", self.stage2_threshold),
            ("min_threshold", self.min_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.result_limit == 0 || self.result_limit > 50 {
            return Err(ConfigError::Invalid(format!(
                "result_limit must be within 1..=50, got {}",
                self.result_limit
            )));
        }
        if self.max_queries == Some(0) {
            return Err(ConfigError::Invalid("max_queries must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Application
// ============================================================================

/// Common audio file extensions (lower-case, without the dot).
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "m4b", "m4p", "mp4", "flac", "ogg", "oga", "opus", "wav", "wave", "aif", "aiff",
    "aifc", "wma", "asf", "ape", "mpc", "mp+", "wv", "tta",
];

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resolver: ResolverConfig,
    pub audio_extensions: Vec<String>,
    /// Minimum interval between catalog calls, shared by all workers
    pub rate_limit_ms: u64,
    pub api_base_url: String,
    /// Pre-issued OAuth bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            rate_limit_ms: 100,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
        }
    }
}

impl AppConfig {
    /// Load a TOML config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.resolver.validate()?;
        Ok(config)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
