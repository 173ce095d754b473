//! Options shared by every command.

use std::path::PathBuf;

use clap::Args;
use getme::cache::{CacheConfig, DiskCache, FetchOptions};
use getme::http::ReqwestTransport;

use crate::error::CliError;

/// Global flags, accepted before or after the subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// API authentication token
    #[arg(long, global = true, alias = "authToken")]
    pub auth_token: Option<String>,

    /// Environment variable holding the API authentication token
    #[arg(long, global = true, alias = "authTokenEnvVariable")]
    pub auth_token_env_variable: Option<String>,

    /// Amazon S3 access key
    #[arg(long, global = true, alias = "s3AccessKey")]
    pub s3_access_key: Option<String>,

    /// Amazon S3 secret key
    #[arg(long, global = true, alias = "s3SecretKey")]
    pub s3_secret_key: Option<String>,

    /// Expected SHA-256 of the artifact
    #[arg(long, global = true)]
    pub sha256: Option<String>,

    /// Download again even if a cached copy exists
    #[arg(long, global = true)]
    pub force: bool,

    /// Cache directory (default: $GETME_CACHE_DIR or ~/.getme/cache)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            auth_token: self.auth_token.clone(),
            auth_token_env_variable: self.auth_token_env_variable.clone(),
            s3_access_key: self.s3_access_key.clone(),
            s3_secret_key: self.s3_secret_key.clone(),
            sha256: self.sha256.clone(),
            force: self.force,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        match &self.cache_dir {
            Some(dir) => CacheConfig::new(dir.clone()),
            None => CacheConfig::default(),
        }
    }

    /// Build the disk cache every command fetches through.
    pub fn disk_cache(&self) -> Result<DiskCache<ReqwestTransport>, CliError> {
        let config = self.cache_config();
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Ok(DiskCache::new(transport, config))
    }
}
