//! Shared fixtures for engine integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use evalmodel_core::RenderConfig;
use evalmodel_render::{CheckResult, Engine};

/// Stand-in for the real renderer. Accepts
/// `-o <out> [-D name=value]... <model>`, echoes each define, records the
/// spawn in `spawns.txt` next to the model, then sources the model file so
/// the test decides what the render does.
const FAKE_RENDERER: &str = r#"#!/bin/sh
out=""
while [ "$#" -gt 1 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -D) echo "define $2"; shift 2 ;;
    *) echo "unexpected argument: $1" >&2; exit 64 ;;
  esac
done
model="$1"
echo "$out" >> "$(dirname "$model")/spawns.txt"
. "$model"
"#;

/// Model body that renders a small artifact after `secs` seconds.
pub fn slow_success(secs: f32) -> String {
    format!("sleep {secs}\nprintf 'solid m\\nendsolid m\\n' > \"$out\"\n")
}

pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub engine: Engine,
}

impl TestEnv {
    /// Fresh directory, fake renderer, and an engine whose model file
    /// contains `model_body`.
    pub fn new(model_body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let exe = dir.path().join("fake-renderer.sh");
        std::fs::write(&exe, FAKE_RENDERER).expect("write renderer");
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755))
            .expect("chmod renderer");

        let model = dir.path().join("Eval Model.scad");
        std::fs::write(&model, model_body).expect("write model");

        let config = RenderConfig::new(
            exe,
            model,
            dir.path().join("modelcache"),
            dir.path().join("logs"),
        )
        .with_poll_interval(Duration::from_millis(20));
        let engine = Engine::new(config).expect("engine");
        Self { dir, engine }
    }

    pub fn spawn_count(&self) -> usize {
        std::fs::read_to_string(self.dir.path().join("spawns.txt"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    pub fn log_dir_is_empty(&self) -> bool {
        dir_is_empty(&self.engine.config().log_dir)
    }
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// Call `check_job` until it reports ready, up to roughly ten seconds.
pub async fn poll_until_ready(
    engine: &Engine,
    params: &evalmodel_core::ParameterSet,
) -> CheckResult {
    for _ in 0..500 {
        let result = engine.check_job(params).await;
        if result.ready {
            return result;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("render did not finish in time");
}
