//! `evalmodel-core` -- pure domain types for the render engine.
//!
//! Parameter sets and their signatures, renderer command-line
//! construction, and the engine configuration value. Nothing in this
//! crate spawns processes or touches an async runtime; process
//! supervision lives in `evalmodel-render`.

pub mod config;
pub mod error;
pub mod hashing;
pub mod invocation;
pub mod params;

pub use config::RenderConfig;
pub use error::ConfigError;
pub use invocation::RenderInvocation;
pub use params::{ParamValue, ParameterSet, ParameterSetBuilder, Signature};
