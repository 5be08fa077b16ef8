//! Error taxonomy for render jobs and the engine.

use std::path::PathBuf;

/// The renderer process could not be launched. No job is registered and
/// no process is left running.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("failed to create render log {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch renderer {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The renderer ran and did not succeed. `log` holds its combined output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("render failed (exit code {exit_code:?}): {log}")]
pub struct RenderError {
    /// `None` when the process was killed by a signal or could not be waited on.
    pub exit_code: Option<i32>,
    pub log: String,
}

/// Filesystem failure outside the normal render flow, such as creating
/// the cache or log directory at startup.
#[derive(Debug, thiserror::Error)]
#[error("cache I/O error at {path}: {source}")]
pub struct CacheIoError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Any failure surfaced by [`Engine::render`](crate::Engine::render).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    CacheIo(#[from] CacheIoError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
