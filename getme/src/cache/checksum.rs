//! SHA-256 checksum calculation for file verification.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{CacheError, CacheResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the lowercase hexadecimal SHA-256 of a file.
pub fn calculate_file_checksum(path: &Path) -> CacheResult<String> {
    let mut file = File::open(path).map_err(|e| CacheError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| CacheError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected checksum.
///
/// The expected value is compared case-insensitively.
pub fn verify_checksum(path: &Path, expected: &str) -> CacheResult<()> {
    let actual = calculate_file_checksum(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// SHA-256 of a string, used for cache keys.
pub(crate) fn checksum_str(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
