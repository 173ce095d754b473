//! Copy command - fetch, then copy the cached file elsewhere.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use getme::cache::CacheStore;
use tracing::info;

use super::GlobalArgs;
use crate::error::CliError;

/// Destination meaning "write to stdout".
const STDOUT: &str = "-";

/// Run the copy command.
pub fn run(global: &GlobalArgs, url: &str, destination: &str) -> Result<(), CliError> {
    let cache = global.disk_cache()?;
    let cached = cache.fetch(url, &global.fetch_options())?;

    info!(url = %url, dest = %destination, "Copying");
    copy_file(&cached, destination).map_err(|source| CliError::Copy {
        destination: destination.to_string(),
        source,
    })
}

fn copy_file(cached: &Path, destination: &str) -> io::Result<()> {
    if destination == STDOUT {
        let mut file = File::open(cached)?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        io::copy(&mut file, &mut out)?;
        return Ok(());
    }

    let destination = Path::new(destination);
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::copy(cached, destination)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let cached = temp.path().join("artifact.bin");
        fs::write(&cached, b"payload").unwrap();
        let dest = temp.path().join("nested/dir/out.bin");

        copy_file(&cached, dest.to_str().unwrap()).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.bin");

        let result = copy_file(&temp.path().join("missing"), dest.to_str().unwrap());

        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
