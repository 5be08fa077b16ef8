//! Renderer command-line construction.
//!
//! The renderer contract is:
//!
//! ```text
//! <executable> -o <artifactPath> [-D name=value]... <modelFilePath>
//! ```
//!
//! Values are passed through untouched; the renderer evaluates them.
//! Arguments are handed to the OS directly (no shell), so no quoting is
//! needed either.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use crate::params::ParameterSet;

/// Argument list for one renderer run, executable excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInvocation {
    args: Vec<OsString>,
}

impl RenderInvocation {
    /// Build the arguments that render `params` against `model_file` into
    /// `output_path`.
    pub fn build(params: &ParameterSet, model_file: &Path, output_path: &Path) -> Self {
        let mut args = Vec::with_capacity(3 + 2 * params.len());
        args.push(OsString::from("-o"));
        args.push(output_path.as_os_str().to_owned());
        for (name, value) in params.render_args() {
            args.push(OsString::from("-D"));
            args.push(OsString::from(format!("{name}={value}")));
        }
        args.push(model_file.as_os_str().to_owned());
        Self { args }
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn into_args(self) -> Vec<OsString> {
        self.args
    }
}

/// Space-joined, lossily decoded. For logs only.
impl fmt::Display for RenderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&arg.to_string_lossy())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
