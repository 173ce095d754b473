//! Release API lookup.

use serde::Deserialize;
use tracing::debug;

use super::{HeaderSpec, ResolveError, ResolveResult};
use crate::http::{HttpRequest, HttpTransport};
use crate::reference::ReleaseAsset;

/// Default release API host.
pub const DEFAULT_API_HOST: &str = "https://api.github.com";

/// Release document returned by the "release by tag" endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAssetList {
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

/// One asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAsset {
    pub id: i64,
    /// Public download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// Authorization-aware API URL.
    #[serde(rename = "url")]
    pub api_url: String,
}

/// Resolves release-asset references against the release API.
pub struct AssetResolver<T> {
    transport: T,
    api_host: String,
}

impl<T: HttpTransport> AssetResolver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_api_host(transport, DEFAULT_API_HOST)
    }

    /// Use a different API host, such as a mirror of the release API.
    ///
    /// Only the host queried changes: references are still recognized as
    /// release assets by their `https://github.com/` download URL.
    pub fn with_api_host(transport: T, api_host: impl Into<String>) -> Self {
        Self {
            transport,
            api_host: api_host.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a public release-asset URL to its API location.
    ///
    /// Headers are validated before any request is made. Errors are not
    /// retried here.
    pub fn resolve_asset_location<S: AsRef<str>>(
        &self,
        reference: &str,
        headers: &[S],
    ) -> ResolveResult<String> {
        let asset = ReleaseAsset::parse(reference)?;
        let headers = HeaderSpec::parse(headers)?;
        self.resolve_parsed(reference, &asset, &headers)
    }

    pub(crate) fn resolve_parsed(
        &self,
        reference: &str,
        asset: &ReleaseAsset,
        headers: &HeaderSpec,
    ) -> ResolveResult<String> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_host, asset.organization, asset.project, asset.tag
        );
        debug!(url = %url, "Looking up release assets");

        let request = HttpRequest::get(&url).headers(headers.entries().iter().cloned());
        let response = self.transport.send(&request)?;
        if response.is_error() {
            return Err(ResolveError::RemoteApi {
                url,
                status: response.status,
            });
        }

        let release: RemoteAssetList =
            serde_json::from_slice(&response.body).map_err(|e| {
                ResolveError::MalformedResponse {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            })?;

        release
            .assets
            .into_iter()
            .find(|a| a.download_url == reference)
            .map(|a| a.api_url)
            .ok_or_else(|| ResolveError::AssetNotFound(reference.to_string()))
    }
}
