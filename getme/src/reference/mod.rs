//! Artifact reference classification.
//!
//! A reference is the string a caller hands to `getme`. Most references are
//! directly fetchable locations (`https://...`, `s3://...`). References that
//! point at a file attached to a GitHub release are classified separately,
//! because private release assets can only be fetched through an
//! authorization-aware API location (see [`crate::release`]).
//!
//! Classification is a pure function of the reference string and never
//! touches the network.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Shape of a public release-asset download URL.
const RELEASE_ASSET_PATTERN: &str =
    r"^https://github\.com/([^/]+)/([^/]+)/releases/download/([^/]+)/(.+)$";

/// File name used when a reference has no usable last path segment.
const FALLBACK_FILE_NAME: &str = "download";

/// Result type for reference parsing.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Errors raised while deriving fields from a reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The reference does not have the release-asset shape.
    #[error("malformed release asset reference: {0}")]
    Malformed(String),
}

/// How a reference must be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Directly fetchable location.
    Direct,
    /// File attached to a tagged release; needs resolution first.
    ReleaseAsset,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Direct => write!(f, "direct"),
            ReferenceKind::ReleaseAsset => write!(f, "release asset"),
        }
    }
}

/// Fields extracted from a confirmed release-asset match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub organization: String,
    pub project: String,
    pub tag: String,
    pub file_name: String,
}

impl ReleaseAsset {
    /// Parse a release-asset reference.
    ///
    /// Only a confirmed structural match yields populated fields; anything
    /// else is [`ReferenceError::Malformed`].
    pub fn parse(reference: &str) -> ReferenceResult<Self> {
        let captures = release_pattern()
            .captures(reference)
            .ok_or_else(|| ReferenceError::Malformed(reference.to_string()))?;

        let field = |index: usize| -> ReferenceResult<String> {
            captures
                .get(index)
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| ReferenceError::Malformed(reference.to_string()))
        };

        Ok(Self {
            organization: field(1)?,
            project: field(2)?,
            tag: field(3)?,
            file_name: field(4)?,
        })
    }
}

/// A classified reference, constructed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    raw: String,
    release: Option<ReleaseAsset>,
}

impl ArtifactReference {
    /// Classify a reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        let raw = reference.into();
        let release = ReleaseAsset::parse(&raw).ok();
        Self { raw, release }
    }

    /// The reference exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> ReferenceKind {
        if self.release.is_some() {
            ReferenceKind::ReleaseAsset
        } else {
            ReferenceKind::Direct
        }
    }

    /// Release fields, present only for [`ReferenceKind::ReleaseAsset`].
    pub fn release(&self) -> Option<&ReleaseAsset> {
        self.release.as_ref()
    }

    /// Last non-empty path segment, ignoring query string and fragment.
    pub fn file_name(&self) -> &str {
        file_name(&self.raw)
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Classify a reference without keeping the parsed fields.
pub fn classify(reference: &str) -> ReferenceKind {
    if release_pattern().is_match(reference) {
        ReferenceKind::ReleaseAsset
    } else {
        ReferenceKind::Direct
    }
}

/// Derive the file name a reference materializes to.
pub fn file_name(reference: &str) -> &str {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let path = &reference[..end];
    let after_scheme = path.find("://").map(|i| &path[i + 3..]).unwrap_or(path);

    // The host (or bucket) is never a file name, and neither are `.`/`..`.
    match after_scheme.split_once('/') {
        Some((_, rest)) => rest
            .rsplit('/')
            .find(|segment| !matches!(*segment, "" | "." | ".."))
            .unwrap_or(FALLBACK_FILE_NAME),
        None => FALLBACK_FILE_NAME,
    }
}

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(RELEASE_ASSET_PATTERN).expect("valid release pattern"))
}
