//! Release asset resolution.
//!
//! Translates a public release-asset URL into the authorization-aware API
//! location that serves the asset bytes, so private release assets can be
//! downloaded with an access token.

mod headers;
mod resolver;

use thiserror::Error;

use crate::http::TransportError;
use crate::reference::ReferenceError;

pub use headers::HeaderSpec;
pub use resolver::{AssetResolver, RemoteAsset, RemoteAssetList, DEFAULT_API_HOST};

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that can occur while resolving a release asset.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference is not a release-asset URL.
    #[error(transparent)]
    MalformedReference(#[from] ReferenceError),

    /// A header argument is not exactly `key=value`.
    #[error("invalid header [{0}]. Should be [key=value]")]
    InvalidHeader(String),

    /// The release API answered with a client or server error.
    #[error("release API {url} returned status {status}")]
    RemoteApi { url: String, status: u16 },

    /// The release API body is not a release document.
    #[error("malformed release API response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// No asset in the release has this public download URL.
    #[error("unable to find this release asset: {0}")]
    AssetNotFound(String),

    /// The lookup request itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
