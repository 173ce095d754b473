//! Archive extraction.
//!
//! The archive format is chosen from the reference's file name, never from
//! the downloaded bytes. Decompression itself is delegated to an
//! [`ArchiveExtractor`]; the default one drives the system `tar` and
//! `unzip` tools.

mod extractor;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::reference;

pub use extractor::ShellExtractor;

/// Suffixes routed to the tar extractor, compressed variants included.
const TAR_SUFFIXES: &[&str] = &[
    ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tbz", ".tar.xz", ".txz",
];

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur during extraction.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The reference has neither a zip nor a tar-family suffix.
    #[error("unsupported archive: {0}")]
    Unsupported(String),

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write an extracted file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a directory while counting extracted files.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The extraction tool failed.
    #[error("failed to extract {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },
}

/// Archive family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from a reference's file-name suffix.
    pub fn from_reference(reference: &str) -> ArchiveResult<Self> {
        let name = reference::file_name(reference).to_ascii_lowercase();
        if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else if TAR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Ok(ArchiveFormat::Tar)
        } else {
            Err(ArchiveError::Unsupported(reference.to_string()))
        }
    }
}

/// One entry to pull out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Entry name inside the archive.
    pub source: String,
    /// Where to write it.
    pub destination: PathBuf,
}

impl ExtractedFile {
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// What to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRequest {
    /// Everything, into a directory.
    All(PathBuf),
    /// Selected entries, in order.
    Files(Vec<ExtractedFile>),
}

/// Performs the actual decompression.
pub trait ArchiveExtractor {
    /// Extract the whole archive, returning the number of files under
    /// `dest_dir` afterwards.
    fn extract_all(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        dest_dir: &Path,
    ) -> ArchiveResult<usize>;

    /// Extract selected entries to their destinations.
    fn extract_files(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        files: &[ExtractedFile],
    ) -> ArchiveResult<()>;
}

/// Extract a fetched archive, routing on the reference's suffix.
///
/// Returns the number of files written.
pub fn extract<E: ArchiveExtractor + ?Sized>(
    extractor: &E,
    reference: &str,
    archive: &Path,
    request: &ExtractionRequest,
) -> ArchiveResult<usize> {
    let format = ArchiveFormat::from_reference(reference)?;

    match request {
        ExtractionRequest::All(dest_dir) => {
            info!(url = %reference, dest = %dest_dir.display(), "Extracting");
            extractor.extract_all(format, archive, dest_dir)
        }
        ExtractionRequest::Files(files) => {
            for file in files {
                info!(
                    url = %reference,
                    entry = %file.source,
                    dest = %file.destination.display(),
                    "Extracting entry"
                );
            }
            extractor.extract_files(format, archive, files)?;
            Ok(files.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingExtractor {
        calls: RefCell<Vec<(ArchiveFormat, &'static str)>>,
    }

    impl ArchiveExtractor for RecordingExtractor {
        fn extract_all(&self, format: ArchiveFormat, _: &Path, _: &Path) -> ArchiveResult<usize> {
            self.calls.borrow_mut().push((format, "all"));
            Ok(3)
        }

        fn extract_files(
            &self,
            format: ArchiveFormat,
            _: &Path,
            _: &[ExtractedFile],
        ) -> ArchiveResult<()> {
            self.calls.borrow_mut().push((format, "files"));
            Ok(())
        }
    }

    #[test]
    fn test_format_from_reference() {
        assert_eq!(
            ArchiveFormat::from_reference("https://x.com/a/tool.zip").unwrap(),
            ArchiveFormat::Zip
        );
        for name in [
            "a.tar", "a.tar.gz", "a.tgz", "a.tar.bz2", "a.tbz2", "a.tar.xz", "a.txz", "A.TGZ",
        ] {
            let reference = format!("https://x.com/{}", name);
            assert_eq!(
                ArchiveFormat::from_reference(&reference).unwrap(),
                ArchiveFormat::Tar,
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_format_ignores_query_string() {
        assert_eq!(
            ArchiveFormat::from_reference("https://x.com/tool.zip?token=abc").unwrap(),
            ArchiveFormat::Zip
        );
    }

    #[test]
    fn test_unsupported_format() {
        for reference in ["https://x.com/a.iso", "https://x.com/a.gz", "https://x.com/zip"] {
            assert!(matches!(
                ArchiveFormat::from_reference(reference),
                Err(ArchiveError::Unsupported(r)) if r == reference
            ));
        }
    }

    #[test]
    fn test_extract_routes_by_reference_suffix() {
        let extractor = RecordingExtractor::default();

        let count = extract(
            &extractor,
            "https://x.com/a.tgz",
            Path::new("/cache/whatever.bin"),
            &ExtractionRequest::All(PathBuf::from("/out")),
        )
        .unwrap();
        assert_eq!(count, 3);

        let files = vec![
            ExtractedFile::new("bin/tool", "/out/tool"),
            ExtractedFile::new("README", "/out/README"),
        ];
        let count = extract(
            &extractor,
            "https://x.com/a.zip",
            Path::new("/cache/whatever.bin"),
            &ExtractionRequest::Files(files),
        )
        .unwrap();
        assert_eq!(count, 2);

        assert_eq!(
            *extractor.calls.borrow(),
            vec![(ArchiveFormat::Tar, "all"), (ArchiveFormat::Zip, "files")]
        );
    }

    #[test]
    fn test_unsupported_reference_never_reaches_extractor() {
        let extractor = RecordingExtractor::default();

        let result = extract(
            &extractor,
            "https://x.com/a.iso",
            Path::new("/cache/a.iso"),
            &ExtractionRequest::All(PathBuf::from("/out")),
        );

        assert!(matches!(result, Err(ArchiveError::Unsupported(_))));
        assert!(extractor.calls.borrow().is_empty());
    }
}
