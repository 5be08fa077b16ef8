//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use evalmodel_core::ParameterSet;

/// Render parameterised models through an external renderer, with
/// request dedup and an on-disk artifact cache.
#[derive(Parser, Debug)]
#[command(name = "evalmodel-worker", version)]
pub struct Cli {
    /// Model definition file (overrides `RENDER_MODEL_FILE`).
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Renderer executable (overrides `RENDER_EXECUTABLE`).
    #[arg(long, global = true)]
    pub executable: Option<PathBuf>,

    /// Artifact cache directory (overrides `RENDER_CACHE_DIR`).
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Transient log directory (overrides `RENDER_LOG_DIR`).
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a parameter set (or reuse the cached artifact) and wait.
    Render(DefineArgs),
    /// Report whether an artifact is cached, without rendering.
    Exists(DefineArgs),
    /// Print the signature and renderer arguments for a parameter set.
    Signature(DefineArgs),
}

#[derive(Parser, Debug)]
pub struct DefineArgs {
    /// Model variable override, e.g. `-D layerHeight=0.2`. Repeatable.
    #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,
}

impl DefineArgs {
    pub fn params(&self) -> ParameterSet {
        self.defines.iter().cloned().collect()
    }
}

impl Cli {
    /// Value given on the command line for a configuration variable.
    pub fn override_for(&self, var: &str) -> Option<String> {
        let path = match var {
            "RENDER_MODEL_FILE" => self.model.as_ref(),
            "RENDER_EXECUTABLE" => self.executable.as_ref(),
            "RENDER_CACHE_DIR" => self.cache_dir.as_ref(),
            "RENDER_LOG_DIR" => self.log_dir.as_ref(),
            _ => None,
        }?;
        Some(path.to_string_lossy().into_owned())
    }
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_define_splits_on_first_equals() {
        assert_eq!(
            parse_define("wall=a==b").expect("parse"),
            ("wall".to_string(), "a==b".to_string())
        );
    }

    #[test]
    fn parse_define_rejects_missing_equals_or_name() {
        assert!(parse_define("layerHeight").is_err());
        assert!(parse_define("=0.2").is_err());
    }

    #[test]
    fn defines_become_a_parameter_set() {
        let cli = Cli::try_parse_from([
            "evalmodel-worker",
            "render",
            "-D",
            "layerHeight=0.2",
            "-D",
            "wall=2 * nozzleDiameter",
        ])
        .expect("parse");
        let Command::Render(args) = cli.command else {
            panic!("expected render subcommand");
        };
        let params = args.params();
        assert_eq!(params.len(), 2);
        assert_eq!(
            params.get("wall").map(|v| v.as_str()),
            Some("2 * nozzleDiameter")
        );
    }

    #[test]
    fn global_overrides_map_to_config_variables() {
        let cli = Cli::try_parse_from([
            "evalmodel-worker",
            "exists",
            "--model",
            "Eval Model.scad",
            "--cache-dir",
            "/tmp/cache",
        ])
        .expect("parse");
        assert_eq!(
            cli.override_for("RENDER_MODEL_FILE").as_deref(),
            Some("Eval Model.scad")
        );
        assert_eq!(
            cli.override_for("RENDER_CACHE_DIR").as_deref(),
            Some("/tmp/cache")
        );
        assert_eq!(cli.override_for("RENDER_LOG_DIR"), None);
        assert_eq!(cli.override_for("RENDER_POLL_INTERVAL_MS"), None);
    }
}
