//! What to build, and how patiently to wait for it.

use std::collections::BTreeMap;
use std::time::Duration;

use super::PollPolicy;

/// Where finished builds publish their artifacts.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Build parameter carrying the commit to build.
const COMMIT_PARAMETER: &str = "COMMIT_ID";

/// Identifies the remote build to trigger and the artifact it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub ci_base_url: String,
    pub user: String,
    pub token: String,
    pub bucket: String,
    pub commit: String,
    pub platform: String,
}

impl BuildRequest {
    /// CI job producing artifacts for this platform.
    pub fn job_name(&self) -> String {
        format!("pinata-{}-iso", self.platform)
    }

    /// Reference of the artifact a successful build publishes.
    pub fn artifact_reference(&self, storage_base_url: &str) -> String {
        format!(
            "{}/{}/{}/docker-for-{}.iso.tgz",
            storage_base_url.trim_end_matches('/'),
            self.bucket,
            self.commit,
            self.platform
        )
    }

    pub fn trigger_parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(COMMIT_PARAMETER.to_string(), self.commit.clone())])
    }
}

/// Policy knobs of the build fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackConfig {
    /// Polling of the pending-task queue.
    pub queue_poll: PollPolicy,
    /// Polling of the running build.
    pub build_poll: PollPolicy,
    pub storage_base_url: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            queue_poll: PollPolicy::every(Duration::from_secs(1)),
            build_poll: PollPolicy::every(Duration::from_secs(5)),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
        }
    }
}

impl FallbackConfig {
    pub fn with_queue_poll(mut self, policy: PollPolicy) -> Self {
        self.queue_poll = policy;
        self
    }

    pub fn with_build_poll(mut self, policy: PollPolicy) -> Self {
        self.build_poll = policy;
        self
    }

    pub fn with_storage_base_url(mut self, url: impl Into<String>) -> Self {
        self.storage_base_url = url.into();
        self
    }
}
