//! The build fallback state machine.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::poll::{poll_until, CancelFlag};
use super::{BuildRequest, FallbackConfig, FallbackError, FallbackResult, Stage};
use crate::cache::{CacheStore, FetchOptions};
use crate::ci::{BuildRecord, CiConnector, CiJob, CiServer};

/// Fetches an artifact, building it on the CI system when it is missing.
///
/// One call to [`BuildFallback::fetch`] is one sequential run; nothing is
/// shared between runs.
pub struct BuildFallback<C, K> {
    cache: C,
    connector: K,
    config: FallbackConfig,
    cancel: CancelFlag,
}

impl<C: CacheStore, K: CiConnector> BuildFallback<C, K> {
    pub fn new(cache: C, connector: K) -> Self {
        Self {
            cache,
            connector,
            config: FallbackConfig::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_config(mut self, config: FallbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe `cancel` between stages and in both poll loops.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Return a local path to the artifact of `request`.
    ///
    /// The cache is tried first. On a miss the build is triggered, awaited
    /// and, if it succeeded, the cache is tried exactly once more.
    pub fn fetch(&self, request: &BuildRequest, options: &FetchOptions) -> FallbackResult<PathBuf> {
        let reference = request.artifact_reference(&self.config.storage_base_url);

        // AttemptCache
        match self.cache.fetch(&reference, options) {
            Ok(path) => return Ok(path),
            Err(e) => warn!(url = %reference, error = %e, "Artifact not available, triggering build"),
        }

        // TriggerBuild
        self.check_cancelled(Stage::TriggerBuild)?;
        let job_name = request.job_name();
        let server = self
            .connector
            .connect(&request.ci_base_url, &request.user, &request.token)
            .map_err(FallbackError::ci(Stage::TriggerBuild))?;
        let job = server
            .job(&job_name)
            .map_err(FallbackError::ci(Stage::TriggerBuild))?;
        self.check_cancelled(Stage::TriggerBuild)?;
        let task = job
            .invoke(&request.trigger_parameters())
            .map_err(FallbackError::ci(Stage::TriggerBuild))?;
        info!(job = %job_name, commit = %request.commit, task, "Triggered build");

        // AwaitQueue
        self.await_queue(server.as_ref(), task)?;

        // LocateBuild
        let located = self.locate_build(job.as_ref(), &request.commit)?;
        info!(job = %job_name, build = located.id, "Located build");

        // AwaitCompletion
        let finished = self.await_completion(job.as_ref(), located)?;

        // Evaluate
        if !finished.is_successful {
            return Err(FallbackError::BuildFailed {
                job: job_name,
                build: finished.id,
            });
        }
        info!(job = %job_name, build = finished.id, "Build succeeded, fetching artifact");
        self.check_cancelled(Stage::Evaluate)?;

        self.cache
            .fetch(&reference, options)
            .map_err(|source| FallbackError::Cache {
                build: finished.id,
                source,
            })
    }

    fn check_cancelled(&self, stage: Stage) -> FallbackResult<()> {
        if self.cancel.is_cancelled() {
            return Err(FallbackError::Cancelled { stage });
        }
        Ok(())
    }

    fn await_queue(&self, server: &dyn CiServer, task: i64) -> FallbackResult<()> {
        info!(task, "Waiting for queue");
        poll_until(Stage::AwaitQueue, &self.config.queue_poll, &self.cancel, || {
            let queued = server
                .queued_task_ids()
                .map_err(FallbackError::ci(Stage::AwaitQueue))?;
            Ok(!queued.contains(&task))
        })
    }

    /// First build, in server order, whose first parameter is `commit`.
    fn locate_build(&self, job: &dyn CiJob, commit: &str) -> FallbackResult<BuildRecord> {
        let ids = job
            .build_ids()
            .map_err(FallbackError::ci(Stage::LocateBuild))?;

        for id in ids {
            let build = job
                .build(id)
                .map_err(FallbackError::ci(Stage::LocateBuild))?;
            if build.is_for_commit(commit) {
                return Ok(build);
            }
        }

        Err(FallbackError::BuildNotFound {
            job: job.name().to_string(),
            commit: commit.to_string(),
        })
    }

    fn await_completion(&self, job: &dyn CiJob, located: BuildRecord) -> FallbackResult<BuildRecord> {
        let id = located.id;
        let mut current = Some(located);
        let mut latest = None;

        poll_until(
            Stage::AwaitCompletion,
            &self.config.build_poll,
            &self.cancel,
            || {
                let build = match current.take() {
                    Some(build) => build,
                    None => job
                        .build(id)
                        .map_err(FallbackError::ci(Stage::AwaitCompletion))?,
                };
                let running = build.is_running;
                if running {
                    debug!(build = id, "Build is running, waiting");
                }
                latest = Some(build);
                Ok(!running)
            },
        )?;

        // poll_until only succeeds after at least one check stored a record.
        latest.ok_or(FallbackError::Cancelled {
            stage: Stage::AwaitCompletion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheResult};
    use crate::ci::{CiError, CiResult};
    use std::cell::Cell;

    struct CountingCache {
        calls: Cell<usize>,
        hit_on_call: Option<usize>,
    }

    impl CacheStore for CountingCache {
        fn fetch(&self, reference: &str, _options: &FetchOptions) -> CacheResult<PathBuf> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if Some(call) == self.hit_on_call {
                Ok(PathBuf::from("/cache/hit"))
            } else {
                Err(CacheError::UnsupportedScheme(reference.to_string()))
            }
        }
    }

    struct UnreachableCi;

    impl CiConnector for UnreachableCi {
        fn connect(&self, base_url: &str, _: &str, _: &str) -> CiResult<Box<dyn CiServer>> {
            Err(CiError::Connect {
                url: base_url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn request() -> BuildRequest {
        BuildRequest {
            ci_base_url: "http://ci.local".to_string(),
            user: "bot".to_string(),
            token: "token".to_string(),
            bucket: "bucket".to_string(),
            commit: "abc123".to_string(),
            platform: "mac".to_string(),
        }
    }

    #[test]
    fn test_cache_hit_skips_ci() {
        let cache = CountingCache {
            calls: Cell::new(0),
            hit_on_call: Some(1),
        };
        let fallback = BuildFallback::new(&cache, UnreachableCi);

        let path = fallback.fetch(&request(), &FetchOptions::default()).unwrap();

        assert_eq!(path, PathBuf::from("/cache/hit"));
        assert_eq!(cache.calls.get(), 1);
    }

    #[test]
    fn test_connect_failure_is_fatal_trigger_error() {
        let cache = CountingCache {
            calls: Cell::new(0),
            hit_on_call: None,
        };
        let fallback = BuildFallback::new(&cache, UnreachableCi);

        let err = fallback
            .fetch(&request(), &FetchOptions::default())
            .unwrap_err();

        assert_eq!(err.stage(), Stage::TriggerBuild);
        assert!(matches!(
            err,
            FallbackError::Ci {
                source: CiError::Connect { .. },
                ..
            }
        ));
        assert_eq!(cache.calls.get(), 1);
    }
}
