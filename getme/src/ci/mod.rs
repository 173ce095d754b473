//! Continuous-integration system access.
//!
//! The build fallback only needs a small capability set from the CI
//! system; it is expressed as three object-safe traits so the orchestrator
//! can be driven by the Jenkins client or by test doubles:
//!
//! ```text
//! CiConnector::connect ──► CiServer ──► job(name) ──► CiJob
//!                              │                        ├── invoke(params) → TaskId
//!                              └── queued_task_ids()    ├── build_ids()
//!                                                       └── build(id) → BuildRecord
//! ```

mod jenkins;

use std::collections::BTreeMap;

use thiserror::Error;

pub use jenkins::JenkinsConnector;

/// Queue item identifier returned by a trigger.
pub type TaskId = i64;

/// Build number within a job.
pub type BuildId = i64;

/// Result type for CI operations.
pub type CiResult<T> = Result<T, CiError>;

/// Errors raised while talking to the CI system.
#[derive(Debug, Error)]
pub enum CiError {
    /// The CI server could not be reached or rejected the credentials.
    #[error("failed to connect to CI server {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The job does not exist.
    #[error("CI job not found: {0}")]
    JobNotFound(String),

    /// The job could not be invoked.
    #[error("failed to trigger {job}: {reason}")]
    Trigger { job: String, reason: String },

    /// A status request failed.
    #[error("CI request {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// A response could not be understood.
    #[error("malformed CI response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

/// One named build parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParameter {
    pub name: String,
    pub value: String,
}

impl BuildParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Snapshot of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub id: BuildId,
    /// By convention the first parameter is the triggering commit.
    pub parameters: Vec<BuildParameter>,
    pub is_running: bool,
    pub is_successful: bool,
}

impl BuildRecord {
    pub fn first_parameter(&self) -> Option<&str> {
        self.parameters.first().map(|p| p.value.as_str())
    }

    /// Whether this build was triggered for `commit`.
    ///
    /// A build without parameters never matches.
    pub fn is_for_commit(&self, commit: &str) -> bool {
        self.first_parameter() == Some(commit)
    }
}

/// Opens sessions against a CI server.
pub trait CiConnector {
    fn connect(&self, base_url: &str, user: &str, token: &str) -> CiResult<Box<dyn CiServer>>;
}

/// A connected CI server.
pub trait CiServer {
    /// Look up a job by name.
    fn job(&self, name: &str) -> CiResult<Box<dyn CiJob>>;

    /// Ids of the tasks currently waiting in the queue.
    fn queued_task_ids(&self) -> CiResult<Vec<TaskId>>;
}

/// A named build definition.
pub trait CiJob {
    fn name(&self) -> &str;

    /// Trigger a build, returning the queue task id.
    fn invoke(&self, parameters: &BTreeMap<String, String>) -> CiResult<TaskId>;

    /// Build ids, in the order the server returns them.
    fn build_ids(&self) -> CiResult<Vec<BuildId>>;

    fn build(&self, id: BuildId) -> CiResult<BuildRecord>;
}
