//! getme - fetch build artifacts through a local cache
//!
//! Artifacts are named by a URL-like reference. Plain `http(s)://` URLs,
//! `s3://bucket/key` objects and GitHub release assets are supported. A
//! fetched artifact is kept in a local cache directory and reused as long as
//! its checksum still matches.
//!
//! When an artifact built by CI is missing, [`fallback::BuildFallback`]
//! triggers the build on the CI server, waits for it, and fetches once more.
//!
//! # Modules
//!
//! - [`reference`]: classify references and derive file names
//! - [`release`]: resolve GitHub release assets to downloadable locations
//! - [`cache`]: the on-disk cache store
//! - [`archive`]: extract zip and tar archives
//! - [`ci`]: CI server access (Jenkins)
//! - [`fallback`]: the build fallback state machine
//! - [`http`]: blocking HTTP transport shared by all of the above

pub mod archive;
pub mod cache;
pub mod ci;
pub mod fallback;
pub mod http;
pub mod reference;
pub mod release;
