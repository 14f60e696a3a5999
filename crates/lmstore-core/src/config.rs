//! `lmstore` Configuration Module
//!
//! Provides configuration file support via `lmstore.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (struct fields set by the caller)
//! 2. Environment variables (`LMSTORE_*`)
//! 3. Configuration file (`lmstore.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Value representation used for probability/backoff payloads.
///
/// Chosen once when a container is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Raw `f32` arrays indexed by offset (lossless, largest).
    #[default]
    Uncompressed,
    /// Codebook indices with a bounded reconstruction error.
    Quantized,
    /// Rank-coded bitstream per order (lossless, smallest).
    Compressed,
}

/// Largest accepted `storage.quantization_bits`.
pub const MAX_QUANTIZATION_BITS: u8 = 24;

/// Score of unseen words when none is configured.
pub const DEFAULT_UNKNOWN_LOG_PROB: f32 = -100.0;

/// Model section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmSection {
    /// Log10 probability returned for words absent from the unigram table.
    pub unknown_word_log_prob: f32,
    /// Highest n-gram length to load (`None` = everything the source has).
    pub max_order: Option<usize>,
}

impl Default for LmSection {
    fn default() -> Self {
        Self {
            unknown_word_log_prob: DEFAULT_UNKNOWN_LOG_PROB,
            max_order: None,
        }
    }
}

/// Storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Representation of the value container.
    pub kind: StorageKind,
    /// Codebook size in bits for quantized storage.
    pub quantization_bits: u8,
    /// Values between random-access checkpoints in compressed storage.
    pub block_size: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            kind: StorageKind::Uncompressed,
            quantization_bits: 8,
            block_size: 32,
        }
    }
}

/// Query cache section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Number of cached scores (0 disables caching).
    pub capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { capacity: 1 << 18 }
    }
}

/// Main `lmstore` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LmConfig {
    /// Model options.
    pub lm: LmSection,
    /// Storage options.
    pub storage: StorageSection,
    /// Cache options.
    pub cache: CacheSection,
}

impl LmConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("lmstore.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LMSTORE_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lm.unknown_word_log_prob.is_finite() || self.lm.unknown_word_log_prob > 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "lm.unknown_word_log_prob".to_string(),
                message: format!(
                    "value {} must be a finite log10 probability (<= 0)",
                    self.lm.unknown_word_log_prob
                ),
            });
        }

        if self.lm.max_order == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "lm.max_order".to_string(),
                message: "value 0 would load no n-grams".to_string(),
            });
        }

        if !(1..=MAX_QUANTIZATION_BITS).contains(&self.storage.quantization_bits) {
            return Err(ConfigError::InvalidValue {
                key: "storage.quantization_bits".to_string(),
                message: format!(
                    "value {} is out of range [1, {MAX_QUANTIZATION_BITS}]",
                    self.storage.quantization_bits
                ),
            });
        }

        if self.storage.block_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "storage.block_size".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        Ok(())
    }

    /// Returns true when the query cache should be installed.
    #[must_use]
    pub fn caching_enabled(&self) -> bool {
        self.cache.capacity > 0
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
