//! Build fallback orchestration.
//!
//! Fetch an artifact through the cache; when that fails, have the CI system
//! build it, wait for the build, and fetch once more.
//!
//! ```text
//! AttemptCache ──ok─────────────────────────────────────────► path
//!    │ miss
//!    ▼
//! TriggerBuild ──► AwaitQueue ──► LocateBuild ──► AwaitCompletion ──► Evaluate
//!  (fatal)         (poll 1s)      (first match)   (poll 5s)            success → fetch again
//! ```
//!
//! The miss in `AttemptCache` is the only recovered failure; every later
//! failure ends the run and reports the stage it happened in. Cancellation
//! is checked before the build is triggered, in both poll loops, and before
//! the final fetch.

mod orchestrator;
mod poll;
mod request;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::ci::{BuildId, CiError};

pub use orchestrator::BuildFallback;
pub use poll::{CancelFlag, PollPolicy};
pub use request::{BuildRequest, FallbackConfig, DEFAULT_STORAGE_BASE_URL};

/// Result type for the build fallback.
pub type FallbackResult<T> = Result<T, FallbackError>;

/// Stages of one fallback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AttemptCache,
    TriggerBuild,
    AwaitQueue,
    LocateBuild,
    AwaitCompletion,
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AttemptCache => "attempt cache",
            Stage::TriggerBuild => "trigger build",
            Stage::AwaitQueue => "await queue",
            Stage::LocateBuild => "locate build",
            Stage::AwaitCompletion => "await completion",
            Stage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Terminal failures of a fallback run.
#[derive(Debug, Error)]
pub enum FallbackError {
    /// A CI call failed.
    #[error("{stage}: {source}")]
    Ci {
        stage: Stage,
        #[source]
        source: CiError,
    },

    /// No listed build was triggered for the commit.
    #[error("locate build: no build of {job} found for commit {commit}")]
    BuildNotFound { job: String, commit: String },

    /// The build finished unsuccessfully.
    #[error("evaluate: build #{build} of {job} failed")]
    BuildFailed { job: String, build: BuildId },

    /// The fetch after a successful build failed.
    #[error("evaluate: fetch after successful build #{build} failed: {source}")]
    Cache {
        build: BuildId,
        #[source]
        source: CacheError,
    },

    /// A poll loop exceeded its timeout.
    #[error("{stage}: gave up after {waited:?}")]
    PollTimeout { stage: Stage, waited: Duration },

    /// The run was cancelled while polling.
    #[error("{stage}: cancelled")]
    Cancelled { stage: Stage },
}

impl FallbackError {
    /// Stage the run ended in.
    pub fn stage(&self) -> Stage {
        match self {
            FallbackError::Ci { stage, .. }
            | FallbackError::PollTimeout { stage, .. }
            | FallbackError::Cancelled { stage } => *stage,
            FallbackError::BuildNotFound { .. } => Stage::LocateBuild,
            FallbackError::BuildFailed { .. } | FallbackError::Cache { .. } => Stage::Evaluate,
        }
    }

    pub(crate) fn ci(stage: Stage) -> impl FnOnce(CiError) -> Self {
        move |source| FallbackError::Ci { stage, source }
    }
}
