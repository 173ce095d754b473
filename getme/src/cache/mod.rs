//! Local artifact cache.
//!
//! The cache materializes a reference to a local file:
//!
//! ```text
//! CacheStore::fetch(reference, options)
//!     │
//!     ├── cached + !force ──► verify sha256 ──► path
//!     │
//!     └── download ──► {path}.part ──► verify sha256 ──► rename ──► path
//!             │
//!             ├── release asset: AssetResolver → API location (token auth)
//!             ├── s3://bucket/key: SigV4-signed GET
//!             └── http(s)://: plain GET
//! ```
//!
//! Entries live at `{cache_dir}/{sha256(reference)}/{file name}`.

mod checksum;
mod config;
mod options;
mod s3;
mod store;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::http::TransportError;
use crate::release::ResolveError;

pub use checksum::{calculate_file_checksum, verify_checksum};
pub use config::{CacheConfig, CACHE_DIR_ENV};
pub use options::FetchOptions;
pub use store::{CacheStore, DiskCache};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while fetching through the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write, rename or create a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// An `s3://` reference was given without both S3 keys.
    #[error("S3 access key and secret key are required for {0}")]
    MissingS3Credentials(String),

    /// The reference scheme has no transport.
    #[error("unsupported reference: {0}")]
    UnsupportedScheme(String),

    /// Release asset resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The download itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CacheError {
    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}
