//! Cache store configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::release::DEFAULT_API_HOST;

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "GETME_CACHE_DIR";

/// Default HTTP timeout (5 minutes; artifacts can be large).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default S3 region.
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Configuration for [`super::DiskCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory of the cache.
    pub cache_dir: PathBuf,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Release API host used to resolve release assets.
    pub api_host: String,

    /// Region used to sign `s3://` requests.
    pub s3_region: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_host: DEFAULT_API_HOST.to_string(),
            s3_region: DEFAULT_S3_REGION.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a configuration rooted at `cache_dir`.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    pub fn with_s3_region(mut self, region: impl Into<String>) -> Self {
        self.s3_region = region.into();
        self
    }
}

/// `$GETME_CACHE_DIR`, else `~/.getme/cache`.
fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".getme")
        .join("cache")
}
