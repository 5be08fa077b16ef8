//! One renderer process and its lifecycle.
//!
//! A [`Job`] moves through `Starting -> Running -> Succeeded | Failed`.
//! The renderer's stdout and stderr both go to a transient log file next
//! to the other job logs. The first observation of process exit, through
//! [`Job::poll_ready`] or [`Job::await_done`], finalizes the job exactly
//! once: the exit status is recorded, the log is read into memory if the
//! render failed, and the log file is deleted either way.
//!
//! Jobs must be started from within a tokio runtime.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;

use evalmodel_core::{ParameterSet, RenderConfig, RenderInvocation, Signature};
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::error::{RenderError, StartError};

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, process not launched yet.
    Starting,
    /// Process launched and not yet observed to exit.
    Running,
    /// Process exited with code 0.
    Succeeded,
    /// Process exited non-zero, was killed, or could not be waited on.
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

pub struct Job {
    params: Arc<ParameterSet>,
    signature: Signature,
    executable: PathBuf,
    model_file: PathBuf,
    artifact_path: PathBuf,
    log_path: PathBuf,
    state: JobState,
    child: Option<Child>,
    pid: Option<u32>,
    started_at: Option<Instant>,
    error: Option<RenderError>,
}

impl Job {
    /// Prepare a job that renders `params` into `artifact_path`.
    ///
    /// The log path gets a random suffix so a retry of the same signature
    /// never collides with a log that is still being cleaned up.
    pub fn new(params: Arc<ParameterSet>, config: &RenderConfig, artifact_path: PathBuf) -> Self {
        let signature = params.signature();
        let log_path = config
            .log_dir
            .join(format!("{signature}-{}.log", Uuid::new_v4()));
        Self {
            params,
            signature,
            executable: config.executable.clone(),
            model_file: config.model_file.clone(),
            artifact_path,
            log_path,
            state: JobState::Starting,
            child: None,
            pid: None,
            started_at: None,
            error: None,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// OS process id, once launched.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Launch the renderer.
    ///
    /// Creates the log file and spawns the process with both output
    /// streams redirected into it. On failure the log file is removed and
    /// the job stays in `Starting`. Calling this on a job that has already
    /// launched does nothing.
    pub fn start(&mut self) -> Result<(), StartError> {
        if self.state != JobState::Starting {
            return Ok(());
        }

        let stdout = File::create(&self.log_path).map_err(|source| StartError::LogFile {
            path: self.log_path.clone(),
            source,
        })?;
        let stderr = match stdout.try_clone() {
            Ok(file) => file,
            Err(source) => {
                drop(stdout);
                self.remove_log();
                return Err(StartError::LogFile {
                    path: self.log_path.clone(),
                    source,
                });
            }
        };

        let invocation =
            RenderInvocation::build(&self.params, &self.model_file, &self.artifact_path);
        tracing::debug!(
            signature = %self.signature,
            executable = %self.executable.display(),
            args = %invocation,
            "Launching renderer",
        );

        let mut cmd = Command::new(&self.executable);
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        let spawned = cmd.spawn();
        // The command keeps its copies of the log handles until dropped.
        drop(cmd);

        match spawned {
            Ok(child) => {
                self.pid = child.id();
                self.child = Some(child);
                self.started_at = Some(Instant::now());
                self.state = JobState::Running;
                tracing::info!(
                    signature = %self.signature,
                    pid = ?self.pid,
                    artifact = %self.artifact_path.display(),
                    "Render job started",
                );
                Ok(())
            }
            Err(source) => {
                self.remove_log();
                tracing::error!(
                    signature = %self.signature,
                    executable = %self.executable.display(),
                    error = %source,
                    "Failed to launch renderer",
                );
                Err(StartError::Spawn {
                    executable: self.executable.clone(),
                    source,
                })
            }
        }
    }

    /// Non-blocking completion check.
    ///
    /// Returns `false` while the process is alive (or was never started).
    /// The first call that sees the process gone finalizes the job; every
    /// later call returns `true` without touching the process again.
    pub fn poll_ready(&mut self) -> bool {
        if self.state.is_terminal() {
            return true;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.finalize(Ok(status));
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.finalize(Err(e));
                true
            }
        }
    }

    /// Wait for the process to exit, finalizing if nobody has yet.
    ///
    /// Returns the artifact path on success or the captured diagnostics on
    /// failure. There is no deadline: a renderer that never exits keeps
    /// this future pending.
    pub async fn await_done(&mut self) -> Result<PathBuf, RenderError> {
        if !self.state.is_terminal() {
            match self.child.as_mut() {
                Some(child) => {
                    let status = child.wait().await;
                    self.finalize(status);
                }
                None => {
                    return Err(RenderError {
                        exit_code: None,
                        log: "render job was never started".to_string(),
                    });
                }
            }
        }
        match self.outcome() {
            Some(Ok(path)) => Ok(path.to_path_buf()),
            Some(Err(err)) => Err(err.clone()),
            None => Err(RenderError {
                exit_code: None,
                log: "render job did not reach a terminal state".to_string(),
            }),
        }
    }

    /// Final result, once the job is terminal.
    pub fn outcome(&self) -> Option<Result<&Path, &RenderError>> {
        match self.state {
            JobState::Succeeded => Some(Ok(&self.artifact_path)),
            JobState::Failed => self.error.as_ref().map(Err),
            JobState::Starting | JobState::Running => None,
        }
    }

    /// Captured diagnostics of a failed render.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.log.as_str())
    }

    // ---- private helpers ----

    fn finalize(&mut self, status: std::io::Result<ExitStatus>) {
        // Dropping the child releases the process handle.
        self.child = None;
        let elapsed_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();

        match status {
            Ok(status) if status.success() => {
                self.state = JobState::Succeeded;
                tracing::info!(
                    signature = %self.signature,
                    pid = ?self.pid,
                    elapsed_ms,
                    "Render job succeeded",
                );
            }
            Ok(status) => {
                let captured = self.read_log();
                let log = if captured.trim().is_empty() {
                    format!("renderer exited ({status}) without output")
                } else {
                    captured
                };
                self.fail(status.code(), log, elapsed_ms);
            }
            Err(e) => {
                let captured = self.read_log();
                let log = if captured.trim().is_empty() {
                    format!("failed to wait for renderer: {e}")
                } else {
                    format!("failed to wait for renderer: {e}\n{captured}")
                };
                self.fail(None, log, elapsed_ms);
            }
        }

        self.remove_log();
    }

    fn fail(&mut self, exit_code: Option<i32>, log: String, elapsed_ms: u64) {
        tracing::warn!(
            signature = %self.signature,
            pid = ?self.pid,
            exit_code = ?exit_code,
            elapsed_ms,
            "Render job failed",
        );
        // A partial artifact must not turn into a cache hit later.
        match std::fs::remove_file(&self.artifact_path) {
            Ok(()) => tracing::debug!(
                path = %self.artifact_path.display(),
                "Removed partial artifact",
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.artifact_path.display(),
                error = %e,
                "Failed to remove partial artifact",
            ),
        }
        self.error = Some(RenderError { exit_code, log });
        self.state = JobState::Failed;
    }

    fn read_log(&self) -> String {
        match std::fs::read(&self.log_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(
                    path = %self.log_path.display(),
                    error = %e,
                    "Failed to read render log",
                );
                String::new()
            }
        }
    }

    fn remove_log(&self) {
        match std::fs::remove_file(&self.log_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.log_path.display(),
                error = %e,
                "Failed to remove render log",
            ),
        }
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if self.state == JobState::Running {
            tracing::warn!(
                signature = %self.signature,
                pid = ?self.pid,
                "Render job dropped while its process is still running",
            );
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("signature", &self.signature)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .field("artifact_path", &self.artifact_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::test_helpers::{fake_renderer_config, write_model, Fixture};

    fn job_for(fixture: &Fixture, params: ParameterSet) -> Job {
        let artifact = fixture
            .config
            .cache_dir
            .join(format!("{}.stl", params.signature()));
        Job::new(Arc::new(params), &fixture.config, artifact)
    }

    fn params() -> ParameterSet {
        ParameterSet::builder().set("layerHeight", 0.2).build()
    }

    #[tokio::test]
    async fn successful_render_writes_artifact_and_removes_log() {
        let fixture = fake_renderer_config();
        write_model(&fixture, "printf 'solid m\\nendsolid m\\n' > \"$out\"\n");

        let mut job = job_for(&fixture, params());
        assert_eq!(job.state(), JobState::Starting);
        job.start().expect("start");
        assert_eq!(job.state(), JobState::Running);
        assert!(job.pid().is_some());

        let path = job.await_done().await.expect("render should succeed");
        assert_eq!(job.state(), JobState::Succeeded);
        assert_eq!(path, job.artifact_path());
        assert!(std::fs::metadata(&path).expect("artifact").len() > 0);
        assert!(!job.log_path().exists(), "log must be deleted on success");
        assert!(job.error_text().is_none());
    }

    #[tokio::test]
    async fn failed_render_captures_combined_output() {
        let fixture = fake_renderer_config();
        write_model(
            &fixture,
            "echo 'compiling'\necho 'ERROR: Parser error in line 3' >&2\nexit 3\n",
        );

        let mut job = job_for(&fixture, params());
        job.start().expect("start");
        let err = job.await_done().await.expect_err("render should fail");

        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(err.exit_code, Some(3));
        assert!(err.log.contains("compiling"), "stdout captured: {}", err.log);
        assert!(err.log.contains("ERROR: Parser error"), "stderr captured: {}", err.log);
        assert!(err.log.contains("define layerHeight=0.2"));
        assert!(!job.log_path().exists(), "log must be deleted on failure");
    }

    #[tokio::test]
    async fn silent_failure_still_has_diagnostic_text() {
        let fixture = fake_renderer_config();
        write_model(&fixture, "exec 1>/dev/null 2>&1\nexit 7\n");

        let mut job = job_for(&fixture, ParameterSet::new());
        job.start().expect("start");
        let err = job.await_done().await.expect_err("render should fail");
        assert_eq!(err.exit_code, Some(7));
        assert!(!err.log.trim().is_empty());
    }

    #[tokio::test]
    async fn failed_render_removes_partial_artifact() {
        let fixture = fake_renderer_config();
        write_model(&fixture, "echo 'partial' > \"$out\"\nexit 1\n");

        let mut job = job_for(&fixture, params());
        job.start().expect("start");
        assert!(job.await_done().await.is_err());
        assert!(!job.artifact_path().exists());
    }

    #[tokio::test]
    async fn poll_ready_is_false_while_running_then_true() {
        let fixture = fake_renderer_config();
        write_model(&fixture, "sleep 0.3\necho ok > \"$out\"\n");

        let mut job = job_for(&fixture, params());
        job.start().expect("start");
        assert!(!job.poll_ready(), "process should still be running");

        let mut ready = false;
        for _ in 0..200 {
            if job.poll_ready() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(ready, "job never finished");
        assert_eq!(job.state(), JobState::Succeeded);
        // Results stay fixed after finalization.
        assert!(job.poll_ready());
        assert_matches!(job.outcome(), Some(Ok(_)));
        assert_matches!(job.await_done().await, Ok(_));
    }

    #[tokio::test]
    async fn missing_executable_is_a_start_error() {
        let mut fixture = fake_renderer_config();
        fixture.config.executable = fixture.dir.path().join("no-such-renderer");

        let mut job = job_for(&fixture, params());
        let err = job.start().expect_err("start should fail");
        assert_matches!(err, StartError::Spawn { .. });
        assert_eq!(job.state(), JobState::Starting);
        assert!(!job.log_path().exists(), "log must not outlive a failed start");
        assert!(!job.poll_ready());
    }

    #[tokio::test]
    async fn missing_log_dir_is_a_start_error() {
        let mut fixture = fake_renderer_config();
        fixture.config.log_dir = fixture.dir.path().join("missing").join("logs");

        let mut job = job_for(&fixture, params());
        assert_matches!(job.start(), Err(StartError::LogFile { .. }));
    }

    #[tokio::test]
    async fn await_on_unstarted_job_reports_error() {
        let fixture = fake_renderer_config();
        let mut job = job_for(&fixture, params());
        let err = job.await_done().await.expect_err("never started");
        assert_eq!(err.exit_code, None);
    }

    #[test]
    fn log_paths_are_unique_per_job() {
        let fixture = fake_renderer_config();
        let a = job_for(&fixture, params());
        let b = job_for(&fixture, params());
        assert_ne!(a.log_path(), b.log_path());
        let name = a.log_path().file_name().and_then(|n| n.to_str()).unwrap_or("");
        assert!(name.starts_with(&format!("{}-", params().signature())));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn terminal_states() {
        assert!(!JobState::Starting.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }
}
