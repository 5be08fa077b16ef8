//! Parameter sets and their deterministic signatures.
//!
//! A [`ParameterSet`] maps renderer variable names to opaque values. The
//! renderer evaluates the values itself (they may be plain numbers or
//! expressions such as `"2 * nozzleDiameter"`), so nothing here parses or
//! validates them.
//!
//! The [`Signature`] of a set is a SHA-256 digest over its canonical form.
//! It doubles as the artifact cache file name and the in-flight job key,
//! so it must not depend on insertion order, hash seeds, or the platform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hashing::sha256_hex;

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A single parameter value, kept as the exact string handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamValue(String);

impl ParamValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Numbers use the shortest representation that round-trips, so `0.2`
/// becomes `"0.2"` and `1.0` becomes `"1"`.
impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self(format!("{value}"))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Deterministic identifier of a [`ParameterSet`]: 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ParameterSet
// ---------------------------------------------------------------------------

/// Immutable mapping of renderer variable name to value.
///
/// Backed by a `BTreeMap`, so iteration is always in sorted-key order and
/// two sets with the same contents compare equal regardless of how they
/// were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    /// An empty set (renders the model with its built-in defaults).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Canonical text form the signature is computed over.
    ///
    /// One `len:name=len:value` line per entry in sorted-key order. The
    /// byte-length prefixes keep the encoding unambiguous when names or
    /// values themselves contain `=` or newlines.
    pub fn canonical_form(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.values {
            let value = value.as_str();
            out.push_str(&format!(
                "{}:{name}={}:{value}\n",
                name.len(),
                value.len()
            ));
        }
        out
    }

    /// Compute the signature of this set.
    pub fn signature(&self) -> Signature {
        Signature(sha256_hex(self.canonical_form().as_bytes()))
    }

    /// `(name, value)` pairs in canonical order, for building command lines.
    pub fn render_args(&self) -> Vec<(&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Accumulates entries for a [`ParameterSet`]. Setting a name twice keeps
/// the last value.
#[derive(Debug, Default)]
pub struct ParameterSetBuilder {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSetBuilder {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> ParameterSet {
        ParameterSet {
            values: self.values,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
