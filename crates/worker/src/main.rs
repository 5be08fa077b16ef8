//! `evalmodel-worker` -- render one parameter set from the command line.
//!
//! Loads a [`RenderConfig`] from the environment (and `.env`), applies any
//! command-line overrides, and drives an [`Engine`]. Results go to stdout
//! as JSON; logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default      | Description                          |
//! |---------------------------|----------|--------------|--------------------------------------|
//! | `RENDER_MODEL_FILE`       | yes      | --           | Model definition passed to renderer  |
//! | `RENDER_EXECUTABLE`       | no       | `openscad`   | Renderer executable                  |
//! | `RENDER_CACHE_DIR`        | no       | `modelcache` | Artifact cache directory             |
//! | `RENDER_LOG_DIR`          | no       | `logs`       | Transient render log directory       |
//! | `RENDER_ARTIFACT_EXT`     | no       | `stl`        | Artifact file extension              |
//! | `RENDER_POLL_INTERVAL_MS` | no       | `250`        | Poll interval while waiting          |

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use evalmodel_core::{RenderConfig, RenderInvocation};
use evalmodel_render::{ArtifactCache, Engine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evalmodel_worker=info,evalmodel_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RenderConfig::from_lookup(|var| {
        cli.override_for(var).or_else(|| std::env::var(var).ok())
    })
    .context("invalid render configuration")?;

    match &cli.command {
        Command::Signature(args) => {
            let params = args.params();
            let cache = ArtifactCache::new(&config.cache_dir, &config.artifact_extension);
            let artifact = cache.artifact_path(&params.signature());
            let invocation = RenderInvocation::build(&params, &config.model_file, &artifact);
            let out = serde_json::json!({
                "signature": params.signature(),
                "params": params,
                "artifact": artifact,
                "command": format!("{} {invocation}", config.executable.display()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Exists(args) => {
            let engine = Engine::new(config).context("failed to prepare cache directories")?;
            let result = engine.check_exists(&args.params());
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.ready {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Render(args) => {
            let engine = Engine::new(config).context("failed to prepare cache directories")?;
            let params = args.params();
            tracing::info!(signature = %params.signature(), "Rendering");

            engine
                .start_job(&params)
                .await
                .context("failed to start renderer")?;
            let result = engine.wait_job(&params).await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.success {
                tracing::info!(path = %result.path.display(), "Render complete");
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::error!("Render failed");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
