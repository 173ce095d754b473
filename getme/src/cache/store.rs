//! Disk-backed cache store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::checksum::{checksum_str, verify_checksum};
use super::s3::{self, S3Location};
use super::{CacheConfig, CacheError, CacheResult, FetchOptions};
use crate::http::{HttpRequest, HttpTransport};
use crate::reference::{ArtifactReference, ReferenceKind};
use crate::release::{AssetResolver, HeaderSpec};

/// Materializes references as local files.
pub trait CacheStore {
    /// Return a local path for `reference`, downloading when needed.
    ///
    /// Fails on network errors and on checksum mismatch (including for an
    /// already cached copy).
    fn fetch(&self, reference: &str, options: &FetchOptions) -> CacheResult<PathBuf>;
}

impl<C: CacheStore + ?Sized> CacheStore for &C {
    fn fetch(&self, reference: &str, options: &FetchOptions) -> CacheResult<PathBuf> {
        (**self).fetch(reference, options)
    }
}

/// Cache store keeping one directory per reference under `cache_dir`.
#[derive(Debug)]
pub struct DiskCache<T> {
    transport: T,
    config: CacheConfig,
}

impl<T: HttpTransport> DiskCache<T> {
    pub fn new(transport: T, config: CacheConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Where `reference` is (or would be) cached.
    pub fn entry_path(&self, reference: &ArtifactReference) -> PathBuf {
        self.config
            .cache_dir
            .join(checksum_str(reference.as_str()))
            .join(reference.file_name())
    }

    fn download(
        &self,
        reference: &ArtifactReference,
        options: &FetchOptions,
        dest: &Path,
    ) -> CacheResult<u64> {
        let request = self.request_for(reference, options)?;
        Ok(self.transport.download(&request, dest)?)
    }

    fn request_for(
        &self,
        reference: &ArtifactReference,
        options: &FetchOptions,
    ) -> CacheResult<HttpRequest> {
        let raw = reference.as_str();

        if let (ReferenceKind::ReleaseAsset, Some(release)) = (reference.kind(), reference.release())
        {
            let mut headers = HeaderSpec::default();
            if let Some(token) = options.resolved_token() {
                headers.push("Authorization", format!("token {}", token));
            }
            let resolver = AssetResolver::with_api_host(&self.transport, &self.config.api_host);
            let location = resolver.resolve_parsed(raw, release, &headers)?;
            debug!(url = %raw, location = %location, "Resolved release asset");

            return Ok(HttpRequest::get(location)
                .headers(headers.entries().iter().cloned())
                .header("Accept", "application/octet-stream"));
        }

        if raw.starts_with("s3://") {
            let location = S3Location::parse(raw)
                .ok_or_else(|| CacheError::UnsupportedScheme(raw.to_string()))?;
            let (access_key, secret_key) = options
                .s3_credentials()
                .ok_or_else(|| CacheError::MissingS3Credentials(raw.to_string()))?;
            return Ok(s3::signed_get(
                &location,
                &self.config.s3_region,
                access_key,
                secret_key,
                Utc::now(),
            ));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(HttpRequest::get(raw));
        }

        Err(CacheError::UnsupportedScheme(raw.to_string()))
    }
}

impl<T: HttpTransport> CacheStore for DiskCache<T> {
    fn fetch(&self, reference: &str, options: &FetchOptions) -> CacheResult<PathBuf> {
        let reference = ArtifactReference::new(reference);
        let path = self.entry_path(&reference);

        if !options.force && path.is_file() {
            if let Some(expected) = options.sha256() {
                verify_checksum(&path, expected)?;
            }
            debug!(url = %reference, path = %path.display(), "Cache hit");
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::write(parent, e))?;
        }

        let partial = path.with_file_name(format!("{}.part", reference.file_name()));
        info!(url = %reference, kind = %reference.kind(), "Downloading");

        let verified = self
            .download(&reference, options, &partial)
            .and_then(|bytes| {
                if let Some(expected) = options.sha256() {
                    verify_checksum(&partial, expected)?;
                }
                Ok(bytes)
            });

        let bytes = match verified {
            Ok(bytes) => bytes,
            Err(e) => {
                fs::remove_file(&partial).ok();
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, &path) {
            fs::remove_file(&partial).ok();
            return Err(CacheError::write(&path, e));
        }
        debug!(url = %reference, bytes, path = %path.display(), "Cached");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockTransport;
    use crate::http::{HttpResponse, TransportError};
    use tempfile::TempDir;

    const DIRECT: &str = "https://storage.example.com/bucket/abc/docker-for-mac.iso.tgz";
    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn cache(temp: &TempDir, mock: MockTransport) -> DiskCache<MockTransport> {
        DiskCache::new(mock, CacheConfig::new(temp.path().to_path_buf()))
    }

    #[test]
    fn test_fetch_downloads_and_caches() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "hello world")),
        );

        let path = store.fetch(DIRECT, &FetchOptions::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
        assert_eq!(path.file_name().unwrap(), "docker-for-mac.iso.tgz");
        assert!(path.starts_with(temp.path()));
        assert!(!path.with_file_name("docker-for-mac.iso.tgz.part").exists());
    }

    #[test]
    fn test_second_fetch_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "hello world")),
        );
        let options = FetchOptions::default();

        let first = store.fetch(DIRECT, &options).unwrap();
        let second = store.fetch(DIRECT, &options).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.transport.request_count(), 1);
    }

    #[test]
    fn test_force_refetches() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new()
                .respond(DIRECT, HttpResponse::new(200, "old"))
                .respond(DIRECT, HttpResponse::new(200, "new")),
        );

        store.fetch(DIRECT, &FetchOptions::default()).unwrap();
        let path = store
            .fetch(DIRECT, &FetchOptions::default().with_force(true))
            .unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "new");
        assert_eq!(store.transport.request_count(), 2);
    }

    #[test]
    fn test_checksum_verified_after_download() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "hello world")),
        );

        let ok = store.fetch(DIRECT, &FetchOptions::default().with_sha256(HELLO_WORLD));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_checksum_mismatch_after_download_leaves_no_entry() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "tampered")),
        );
        let reference = ArtifactReference::new(DIRECT);

        let result = store.fetch(DIRECT, &FetchOptions::default().with_sha256(HELLO_WORLD));

        assert!(matches!(result, Err(CacheError::ChecksumMismatch { .. })));
        let path = store.entry_path(&reference);
        assert!(!path.exists());
        assert!(!path.with_file_name("docker-for-mac.iso.tgz.part").exists());
    }

    #[test]
    fn test_failed_rename_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "hello world")),
        );
        let path = store.entry_path(&ArtifactReference::new(DIRECT));
        // A non-empty directory in the way makes the final rename fail.
        fs::create_dir_all(path.join("occupied")).unwrap();

        let result = store.fetch(DIRECT, &FetchOptions::default());

        assert!(matches!(result, Err(CacheError::WriteFailed { .. })));
        assert!(!path.with_file_name("docker-for-mac.iso.tgz.part").exists());
    }

    #[test]
    fn test_dot_segment_reference_stays_inside_its_entry() {
        let temp = TempDir::new().unwrap();
        let reference = "https://example.com/..";
        let store = cache(
            &temp,
            MockTransport::new().respond(reference, HttpResponse::new(200, "hello world")),
        );

        let path = store.fetch(reference, &FetchOptions::default()).unwrap();

        assert_eq!(path.file_name().unwrap(), "download");
        assert!(path.starts_with(temp.path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[test]
    fn test_checksum_mismatch_on_cached_copy_without_force() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(200, "hello world")),
        );

        store.fetch(DIRECT, &FetchOptions::default()).unwrap();
        let result = store.fetch(DIRECT, &FetchOptions::default().with_sha256("0000"));

        assert!(matches!(result, Err(CacheError::ChecksumMismatch { .. })));
        assert_eq!(store.transport.request_count(), 1);
    }

    #[test]
    fn test_http_error_is_transport_error() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(DIRECT, HttpResponse::new(404, "")),
        );

        let result = store.fetch(DIRECT, &FetchOptions::default());
        assert!(matches!(
            result,
            Err(CacheError::Transport(TransportError::Status { status: 404, .. }))
        ));
    }

    #[test]
    fn test_release_asset_resolved_then_downloaded_with_token() {
        let reference = "https://github.com/docker/pinata/releases/download/v1.0/tool.zip";
        let api = "https://api.github.com/repos/docker/pinata/releases/tags/v1.0";
        let asset = "https://api.github.com/repos/docker/pinata/releases/assets/9";
        let body = serde_json::json!({
            "assets": [{ "id": 9, "browser_download_url": reference, "url": asset }]
        })
        .to_string();

        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new()
                .respond(api, HttpResponse::new(200, body))
                .respond(asset, HttpResponse::new(200, "hello world")),
        );

        let path = store
            .fetch(
                reference,
                &FetchOptions::default()
                    .with_auth_token("s3cret")
                    .with_sha256(HELLO_WORLD),
            )
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "tool.zip");
        let download = store.transport.last_request().unwrap();
        assert_eq!(download.url, asset);
        assert!(download
            .headers
            .contains(&("Authorization".to_string(), "token s3cret".to_string())));
        assert!(download
            .headers
            .contains(&("Accept".to_string(), "application/octet-stream".to_string())));
    }

    #[test]
    fn test_release_asset_missing_is_resolve_error() {
        let reference = "https://github.com/docker/pinata/releases/download/v1.0/tool.zip";
        let api = "https://api.github.com/repos/docker/pinata/releases/tags/v1.0";

        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(api, HttpResponse::new(200, r#"{"assets": []}"#)),
        );

        let result = store.fetch(reference, &FetchOptions::default());
        assert!(matches!(result, Err(CacheError::Resolve(_))));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let temp = TempDir::new().unwrap();
        let store = cache(&temp, MockTransport::new());

        let result = store.fetch("s3://bucket/key.tgz", &FetchOptions::default());

        assert!(matches!(result, Err(CacheError::MissingS3Credentials(_))));
        assert_eq!(store.transport.request_count(), 0);
    }

    #[test]
    fn test_s3_request_is_signed() {
        let temp = TempDir::new().unwrap();
        let store = cache(
            &temp,
            MockTransport::new().respond(
                "https://bucket.s3.amazonaws.com/dir/key.tgz",
                HttpResponse::new(200, "hello world"),
            ),
        );

        store
            .fetch(
                "s3://bucket/dir/key.tgz",
                &FetchOptions::default().with_s3_keys("AKID", "secret"),
            )
            .unwrap();

        let request = store.transport.last_request().unwrap();
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v.starts_with("AWS4-HMAC-SHA256")));
    }

    #[test]
    fn test_unsupported_scheme() {
        let temp = TempDir::new().unwrap();
        let store = cache(&temp, MockTransport::new());

        let result = store.fetch("ftp://example.com/file.zip", &FetchOptions::default());
        assert!(matches!(result, Err(CacheError::UnsupportedScheme(_))));
    }
}
