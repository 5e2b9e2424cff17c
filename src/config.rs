//! Configuration file parser for `~/.config/feedtree/config.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as likely typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::feed::{ParserOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DOCUMENT_BYTES};
use crate::ids::{IdPool, RawId};
use crate::model::RefeedPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Abort a parse on a duplicate element instead of keeping the first.
    pub strict: bool,

    /// `"replace"` or `"append"`; see [`RefeedPolicy`].
    pub refeed: RefeedPolicy,

    /// Largest document accepted, in bytes.
    pub max_document_bytes: usize,

    /// Deepest element nesting accepted.
    pub max_depth: usize,

    /// Cap on live identifiers. Unset means the full 32-bit range.
    pub id_limit: Option<RawId>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            refeed: RefeedPolicy::Replace,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            id_limit: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "strict",
        "refeed",
        "max_document_bytes",
        "max_depth",
        "id_limit",
        "log_filter",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Zero limits → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            strict = config.strict,
            refeed = ?config.refeed,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses configuration text. Empty text yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_document_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        if self.id_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "id_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for every parse run under this configuration.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            strict: self.strict,
            refeed: self.refeed,
            max_document_bytes: self.max_document_bytes,
            max_depth: self.max_depth,
        }
    }

    /// A fresh identifier pool honoring `id_limit`.
    pub fn id_pool(&self) -> IdPool {
        match self.id_limit {
            Some(limit) => IdPool::with_limit(limit),
            None => IdPool::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
