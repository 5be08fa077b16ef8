//! Render job supervision and artifact caching.
//!
//! An [`Engine`] turns parameter sets into rendered artifacts by running
//! the external renderer once per distinct [`Signature`], deduplicating
//! concurrent requests, and exposing a non-blocking start/check protocol.
//! Rendered artifacts live in an [`ArtifactCache`] on disk and survive
//! restarts; the in-flight job table does not.
//!
//! [`Signature`]: evalmodel_core::Signature

pub mod cache;
pub mod engine;
pub mod error;
pub mod job;
pub mod status;

pub use cache::ArtifactCache;
pub use engine::Engine;
pub use error::{CacheIoError, EngineError, RenderError, StartError};
pub use job::{Job, JobState};
pub use status::{CheckResult, StartOutcome};
