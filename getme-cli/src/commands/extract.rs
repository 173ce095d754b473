//! Extract command - fetch an archive and unpack all or part of it.

use std::path::PathBuf;

use getme::archive::{self, ExtractedFile, ExtractionRequest, ShellExtractor};
use getme::cache::CacheStore;
use tracing::info;

use super::GlobalArgs;
use crate::error::CliError;

/// Run the extract command.
///
/// A single target is a destination directory for the whole archive.
/// Otherwise targets are `source destination` pairs.
pub fn run(global: &GlobalArgs, url: &str, targets: &[String]) -> Result<(), CliError> {
    let request = parse_targets(targets)?;

    let cache = global.disk_cache()?;
    let cached = cache.fetch(url, &global.fetch_options())?;

    let count = archive::extract(&ShellExtractor::new(), url, &cached, &request)?;
    info!(url = %url, files = count, "Extracted");
    Ok(())
}

fn parse_targets(targets: &[String]) -> Result<ExtractionRequest, CliError> {
    match targets {
        [] => Err(CliError::Usage(
            "extract needs a destination directory or source/destination pairs".to_string(),
        )),
        [dest_dir] => Ok(ExtractionRequest::All(PathBuf::from(dest_dir))),
        pairs if pairs.len() % 2 != 0 => Err(CliError::Usage(format!(
            "extract expects source/destination pairs, got {} arguments",
            pairs.len()
        ))),
        pairs => Ok(ExtractionRequest::Files(
            pairs
                .chunks_exact(2)
                .map(|pair| ExtractedFile::new(pair[0].as_str(), pair[1].as_str()))
                .collect(),
        )),
    }
}
