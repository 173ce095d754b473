//! CLI error types.

use std::fmt;
use std::io;

use getme::archive::ArchiveError;
use getme::cache::CacheError;
use getme::fallback::FallbackError;
use getme::http::TransportError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Arguments that parse but make no sense together.
    Usage(String),

    /// The HTTP client could not be built.
    Transport(TransportError),

    /// Fetching through the cache failed.
    Cache(CacheError),

    /// Extraction failed.
    Archive(ArchiveError),

    /// The build fallback failed.
    Fallback(FallbackError),

    /// Copying the artifact failed.
    Copy { destination: String, source: io::Error },

    /// Setup error (signal handler, etc).
    Config(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Transport(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "{}", e),
            CliError::Archive(e) => write!(f, "{}", e),
            CliError::Fallback(e) => write!(f, "{}", e),
            CliError::Copy {
                destination,
                source,
            } => write!(f, "Failed to copy to {}: {}", destination, source),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Transport(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Archive(e) => Some(e),
            CliError::Fallback(e) => Some(e),
            CliError::Copy { source, .. } => Some(source),
            CliError::Usage(_) | CliError::Config(_) => None,
        }
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ArchiveError> for CliError {
    fn from(e: ArchiveError) -> Self {
        CliError::Archive(e)
    }
}

impl From<FallbackError> for CliError {
    fn from(e: FallbackError) -> Self {
        CliError::Fallback(e)
    }
}
