//! Render engine configuration.
//!
//! Everything an engine needs to know about its environment is carried in
//! one [`RenderConfig`] value passed to the engine constructor, so several
//! engines (e.g. one per test) can coexist without sharing state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default renderer executable, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "openscad";

/// Default artifact cache directory.
pub const DEFAULT_CACHE_DIR: &str = "modelcache";

/// Default directory for transient render logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default artifact file extension (without the dot).
pub const DEFAULT_ARTIFACT_EXT: &str = "stl";

/// Default interval between job polls while waiting for a render.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Renderer executable (absolute path or a name looked up in `PATH`).
    pub executable: PathBuf,
    /// Model definition file passed as the renderer's last argument.
    pub model_file: PathBuf,
    /// Directory holding rendered artifacts, one file per signature.
    pub cache_dir: PathBuf,
    /// Directory for per-job output logs. Logs are removed after each job.
    pub log_dir: PathBuf,
    /// Artifact file extension (without the dot).
    pub artifact_extension: String,
    /// How often blocking waits re-poll a running job.
    pub poll_interval: Duration,
}

impl RenderConfig {
    pub fn new(
        executable: impl Into<PathBuf>,
        model_file: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            model_file: model_file.into(),
            cache_dir: cache_dir.into(),
            log_dir: log_dir.into(),
            artifact_extension: DEFAULT_ARTIFACT_EXT.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_artifact_extension(mut self, ext: impl Into<String>) -> Self {
        self.artifact_extension = ext.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Variable                  | Required | Default      |
    /// |---------------------------|----------|--------------|
    /// | `RENDER_EXECUTABLE`       | no       | `openscad`   |
    /// | `RENDER_MODEL_FILE`       | yes      | --           |
    /// | `RENDER_CACHE_DIR`        | no       | `modelcache` |
    /// | `RENDER_LOG_DIR`          | no       | `logs`       |
    /// | `RENDER_ARTIFACT_EXT`     | no       | `stl`        |
    /// | `RENDER_POLL_INTERVAL_MS` | no       | `250`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so callers can supply their own source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_file = lookup("RENDER_MODEL_FILE")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("RENDER_MODEL_FILE"))?;

        let executable =
            lookup("RENDER_EXECUTABLE").unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());
        let cache_dir =
            lookup("RENDER_CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());
        let log_dir = lookup("RENDER_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let artifact_extension = lookup("RENDER_ARTIFACT_EXT")
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_EXT.to_string());
        if artifact_extension.is_empty() || artifact_extension.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                var: "RENDER_ARTIFACT_EXT",
                reason: format!("'{artifact_extension}' is not a file extension"),
            });
        }

        let poll_interval_ms = match lookup("RENDER_POLL_INTERVAL_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "RENDER_POLL_INTERVAL_MS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            executable: PathBuf::from(executable),
            model_file: PathBuf::from(model_file),
            cache_dir: PathBuf::from(cache_dir),
            log_dir: PathBuf::from(log_dir),
            artifact_extension,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }

    pub fn model_file(&self) -> &Path {
        &self.model_file
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
