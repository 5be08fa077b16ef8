//! Render orchestration: cache lookup, request dedup, and job lifecycle.
//!
//! The [`Engine`] owns every in-flight [`Job`] in a table keyed by
//! signature. All check-then-act sequences on that table (dedup on start,
//! one-shot removal on completion) run under a single lock acquisition,
//! so any number of request handlers may share one engine behind an
//! `Arc`.
//!
//! Two entry points exist for a caller that wants an artifact:
//!
//! - [`Engine::start_job`] followed by repeated [`Engine::check_job`],
//! - [`Engine::check_job`] alone, which starts a render on a cache miss.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use evalmodel_core::{ParameterSet, RenderConfig, Signature};
use tokio::sync::Mutex;

use crate::cache::ArtifactCache;
use crate::error::{CacheIoError, EngineError, RenderError, StartError};
use crate::job::Job;
use crate::status::{CheckResult, StartOutcome, MSG_NOT_FOUND, MSG_STARTED_ON_MISS};

pub struct Engine {
    config: RenderConfig,
    cache: ArtifactCache,
    /// In-flight jobs. An entry exists from a successful start until the
    /// first caller observes the job's terminal state.
    jobs: Mutex<HashMap<Signature, Job>>,
}

impl Engine {
    /// Create an engine, making sure the cache and log directories exist.
    pub fn new(config: RenderConfig) -> Result<Self, CacheIoError> {
        let cache = ArtifactCache::new(&config.cache_dir, &config.artifact_extension);
        cache.ensure_dir()?;
        std::fs::create_dir_all(&config.log_dir).map_err(|source| CacheIoError {
            path: config.log_dir.clone(),
            source,
        })?;

        tracing::info!(
            executable = %config.executable.display(),
            model = %config.model_file.display(),
            cache_dir = %config.cache_dir.display(),
            log_dir = %config.log_dir.display(),
            "Render engine ready",
        );

        Ok(Self {
            config,
            cache,
            jobs: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Make sure a render for `params` is underway or already cached.
    ///
    /// At most one job per signature is tracked at a time: a second start
    /// while one is running is a no-op. A cached artifact never spawns a
    /// process. A job enters the table only after its process launched.
    pub async fn start_job(&self, params: &ParameterSet) -> Result<StartOutcome, StartError> {
        let signature = params.signature();
        let mut jobs = self.jobs.lock().await;
        self.start_locked(&mut jobs, params, signature)
    }

    /// Non-blocking status query.
    ///
    /// - Tracked job still running: `ready = false`.
    /// - Tracked job finished: the job leaves the table and its result is
    ///   returned. Only this first observer sees it; later checks fall
    ///   through to the cache.
    /// - No job, artifact cached: `ready = true, success = true`.
    /// - No job, no artifact: a render is started and `ready = false` is
    ///   returned with a note saying so. If that start fails the result
    ///   is terminal with the start error as diagnostic text.
    pub async fn check_job(&self, params: &ParameterSet) -> CheckResult {
        let signature = params.signature();
        let mut jobs = self.jobs.lock().await;

        if let Some(result) = Self::poll_tracked(&mut jobs, &signature) {
            return result;
        }

        let (found, path) = self.cache.exists(&signature);
        if found {
            return CheckResult::cache_hit(path);
        }

        match self.start_locked(&mut jobs, params, signature) {
            Ok(_) => CheckResult::cache_miss(path, MSG_STARTED_ON_MISS),
            Err(e) => CheckResult::failed(path, format!("{MSG_NOT_FOUND}; failed to start one: {e}")),
        }
    }

    /// Cache-only existence check. Never touches the job table.
    pub fn check_exists(&self, params: &ParameterSet) -> CheckResult {
        let (found, path) = self.cache.exists(&params.signature());
        if found {
            CheckResult::cache_hit(path)
        } else {
            CheckResult::cache_miss(path, MSG_NOT_FOUND)
        }
    }

    /// Wait until the tracked job for `params` finishes and take its result.
    ///
    /// Polls every [`RenderConfig::poll_interval`] without holding the job
    /// table lock in between, so other callers are not blocked. Never
    /// starts a job: with nothing tracked this reports the cache state.
    pub async fn wait_job(&self, params: &ParameterSet) -> CheckResult {
        let signature = params.signature();
        loop {
            {
                let mut jobs = self.jobs.lock().await;
                match Self::poll_tracked(&mut jobs, &signature) {
                    Some(result) if result.ready => return result,
                    Some(_) => {}
                    None => return self.check_exists(params),
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Start (or join) a render and wait for its artifact.
    pub async fn render(&self, params: &ParameterSet) -> Result<PathBuf, EngineError> {
        if let StartOutcome::Cached(path) = self.start_job(params).await? {
            return Ok(path);
        }
        let result = self.wait_job(params).await;
        if result.ready && result.success {
            Ok(result.path)
        } else {
            Err(RenderError {
                exit_code: None,
                log: result.error_text,
            }
            .into())
        }
    }

    /// Number of jobs currently tracked.
    pub async fn in_flight(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_in_flight(&self, params: &ParameterSet) -> bool {
        self.jobs.lock().await.contains_key(&params.signature())
    }

    // ---- private helpers ----

    fn start_locked(
        &self,
        jobs: &mut HashMap<Signature, Job>,
        params: &ParameterSet,
        signature: Signature,
    ) -> Result<StartOutcome, StartError> {
        if jobs.contains_key(&signature) {
            tracing::debug!(signature = %signature, "Render already in flight");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let (found, path) = self.cache.exists(&signature);
        if found {
            tracing::debug!(signature = %signature, path = %path.display(), "Artifact cache hit");
            return Ok(StartOutcome::Cached(path));
        }

        let mut job = Job::new(Arc::new(params.clone()), &self.config, path);
        job.start()?;
        jobs.insert(signature, job);
        Ok(StartOutcome::Started)
    }

    /// Poll the tracked job for `signature`, removing it once terminal.
    /// `None` when no job is tracked.
    fn poll_tracked(
        jobs: &mut HashMap<Signature, Job>,
        signature: &Signature,
    ) -> Option<CheckResult> {
        let job = jobs.get_mut(signature)?;
        if !job.poll_ready() {
            return Some(CheckResult::pending(job.artifact_path().to_path_buf()));
        }

        let job = jobs.remove(signature)?;
        let path = job.artifact_path().to_path_buf();
        let result = match job.outcome() {
            Some(Ok(_)) => CheckResult::done_ok(path),
            Some(Err(err)) => CheckResult::failed(path, err.log.clone()),
            None => CheckResult::pending(path),
        };
        tracing::debug!(
            signature = %signature,
            success = result.success,
            "Render job collected",
        );
        Some(result)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
