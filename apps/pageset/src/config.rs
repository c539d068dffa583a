use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::selection::{DEFAULT_MARKER_BASE, MarkerCodec, MarkerError};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const DEFAULT_TOTAL_RECORDS: u64 = 100;
pub const DEFAULT_ID_BASE: i64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {reason}")]
    Toml { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Marker(#[from] MarkerError),
}

/// Session configuration for the browser and its demo record source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Records per page; fixed for the session.
    pub page_size: u32,
    /// Placeholder encoding base; must exceed `page_size`.
    pub marker_base: u64,
    /// Size of the generated record set (ignored with `records_file`).
    pub total_records: u64,
    /// Generated record ids are `id_base + position`.
    pub id_base: i64,
    pub latency_ms: u64,
    pub jitter_ms: u64,
    pub fail_pages: Vec<u64>,
    /// JSON array of records to serve instead of generated ones.
    pub records_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            marker_base: DEFAULT_MARKER_BASE,
            total_records: DEFAULT_TOTAL_RECORDS,
            id_base: DEFAULT_ID_BASE,
            latency_ms: 0,
            jitter_ms: 0,
            fail_pages: Vec::new(),
            records_file: None,
        }
    }
}

/// Per-field overrides layered on top of the file (flags and env vars).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub page_size: Option<u32>,
    pub marker_base: Option<u64>,
    pub total_records: Option<u64>,
    pub id_base: Option<i64>,
    pub latency_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub fail_pages: Vec<u64>,
    pub records_file: Option<PathBuf>,
}

impl Config {
    /// `~/.pageset/config.toml`, when a home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|base| base.home_dir().join(".pageset").join("config.toml"))
    }

    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|reason| ConfigError::Toml { path, reason })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|err| err.to_string())
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(value) = overrides.page_size {
            self.page_size = value;
        }
        if let Some(value) = overrides.marker_base {
            self.marker_base = value;
        }
        if let Some(value) = overrides.total_records {
            self.total_records = value;
        }
        if let Some(value) = overrides.id_base {
            self.id_base = value;
        }
        if let Some(value) = overrides.latency_ms {
            self.latency_ms = value;
        }
        if let Some(value) = overrides.jitter_ms {
            self.jitter_ms = value;
        }
        if !overrides.fail_pages.is_empty() {
            self.fail_pages = overrides.fail_pages.clone();
        }
        if let Some(path) = overrides.records_file.as_ref() {
            self.records_file = Some(path.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.id_base < 0 {
            return Err(ConfigError::Invalid(
                "id_base must be non-negative; negative ids are reserved for placeholders".into(),
            ));
        }
        self.codec()?;
        Ok(())
    }

    pub fn codec(&self) -> Result<MarkerCodec, ConfigError> {
        Ok(MarkerCodec::new(self.marker_base, self.page_size)?)
    }
}
