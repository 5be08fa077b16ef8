//! Result records returned to callers of the [`Engine`](crate::Engine).

use std::path::PathBuf;

use serde::Serialize;

/// Diagnostic returned by a check that found neither a job nor an artifact
/// and started a render in response.
pub const MSG_STARTED_ON_MISS: &str = "no job or cache entry; started one";

/// Diagnostic returned by a wait or exists query that found nothing.
pub const MSG_NOT_FOUND: &str = "no job or cache entry";

/// What [`Engine::start_job`](crate::Engine::start_job) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A job for this signature was already running; nothing was spawned.
    AlreadyRunning,
    /// The artifact is already cached; nothing was spawned.
    Cached(PathBuf),
    /// A new renderer process was launched.
    Started,
}

/// Status of a parameter set as seen by `check`, `wait`, and `exists`.
///
/// `path` is always the signature-derived artifact path; it only points at
/// a usable file when `ready && success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub ready: bool,
    pub path: PathBuf,
    pub success: bool,
    pub error_text: String,
}

impl CheckResult {
    /// A render is still in progress.
    pub fn pending(path: PathBuf) -> Self {
        Self {
            ready: false,
            path,
            success: false,
            error_text: String::new(),
        }
    }

    /// A render this caller observed has just finished successfully.
    pub fn done_ok(path: PathBuf) -> Self {
        Self {
            ready: true,
            path,
            success: true,
            error_text: String::new(),
        }
    }

    pub fn failed(path: PathBuf, error_text: impl Into<String>) -> Self {
        Self {
            ready: true,
            path,
            success: false,
            error_text: error_text.into(),
        }
    }

    /// The artifact was already in the cache.
    pub fn cache_hit(path: PathBuf) -> Self {
        Self::done_ok(path)
    }

    /// Nothing is cached and nothing is running. Not terminal: callers are
    /// expected to start a render and keep polling.
    pub fn cache_miss(path: PathBuf, note: impl Into<String>) -> Self {
        Self {
            ready: false,
            path,
            success: false,
            error_text: note.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
