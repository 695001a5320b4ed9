//! Feed configuration.
//!
//! Loaded from `<config_dir>/PulseFeed/config.json` (or a path given on the
//! command line), then overridden from the environment. Every value is
//! validated before anything gets mounted.

use log::{debug, info};
use pulse_stream::{BufferConfigError, Endpoint};
use pulse_window::{Viewport, WindowConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "PULSEFEED_ENDPOINT";
pub const ENV_TENANT: &str = "PULSEFEED_TENANT";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/api/events/stream";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error(transparent)]
    Buffer(#[from] BufferConfigError),

    #[error(transparent)]
    Window(#[from] WindowConfigError),
}

/// Raw configuration as written in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub endpoint: String,
    pub tenant: Option<String>,
    pub max_items: i64,
    pub auto_start: bool,
    pub item_height: f64,
    pub viewport_height: f64,
    pub overscan: i64,
    pub frame_interval_ms: u64,
    pub resize_debounce_ms: u64,
    pub warn_throttle_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tenant: None,
            max_items: 500,
            auto_start: true,
            item_height: 1.0,
            viewport_height: 20.0,
            overscan: 2,
            frame_interval_ms: 16,
            resize_debounce_ms: 150,
            warn_throttle_ms: 5000,
            connect_timeout_ms: 5000,
            read_timeout_ms: 1000,
        }
    }
}

/// Validated settings the pipeline is mounted with.
#[derive(Clone, Debug)]
pub struct FeedSettings {
    pub endpoint: Endpoint,
    pub max_items: i64,
    pub auto_start: bool,
    pub viewport: Viewport,
    pub frame_interval: Duration,
    pub resize_debounce: Duration,
    pub warn_throttle: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

/// Default config location.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("PulseFeed").join("config.json"))
}

impl FeedConfig {
    /// Load from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the explicit path if given, else the default location.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit.map(Path::to_path_buf).or_else(default_path) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `PULSEFEED_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Ok(tenant) = std::env::var(ENV_TENANT) {
            self.tenant = Some(tenant);
        }
    }

    pub fn validate(&self) -> Result<FeedSettings, ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.max_items <= 0 {
            return Err(BufferConfigError::MaxItems(self.max_items).into());
        }
        let viewport = Viewport::from_signed(self.item_height, self.viewport_height, self.overscan)?;

        Ok(FeedSettings {
            endpoint: Endpoint::new(self.endpoint.trim()).with_tenant(self.tenant.clone()),
            max_items: self.max_items,
            auto_start: self.auto_start,
            viewport,
            frame_interval: Duration::from_millis(self.frame_interval_ms.max(1)),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            warn_throttle: Duration::from_millis(self.warn_throttle_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
        })
    }
}
