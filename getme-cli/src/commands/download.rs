//! Download command - fetch into the cache and print the local path.

use getme::cache::CacheStore;

use super::GlobalArgs;
use crate::error::CliError;

/// Run the download command.
pub fn run(global: &GlobalArgs, url: &str) -> Result<(), CliError> {
    let cache = global.disk_cache()?;
    let path = cache.fetch(url, &global.fetch_options())?;
    println!("{}", path.display());
    Ok(())
}
