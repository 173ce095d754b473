//! Pinata command - fetch a Docker for Mac/Windows ISO, building it on CI
//! when it has not been published yet.

use std::time::Duration;

use getme::ci::JenkinsConnector;
use getme::fallback::{BuildFallback, BuildRequest, CancelFlag, FallbackConfig};
use getme::http::ReqwestTransport;
use tracing::warn;

use super::GlobalArgs;
use crate::error::CliError;

/// Arguments for the pinata command.
pub struct PinataArgs {
    pub request: BuildRequest,
    pub queue_timeout: Option<u64>,
    pub build_timeout: Option<u64>,
}

/// Run the pinata command.
pub fn run(global: &GlobalArgs, args: PinataArgs) -> Result<(), CliError> {
    let cache = global.disk_cache()?;
    let ci_transport = ReqwestTransport::new()?;

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Received interrupt, cancelling");
        handler_flag.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let fallback = BuildFallback::new(cache, JenkinsConnector::new(ci_transport))
        .with_config(fallback_config(args.queue_timeout, args.build_timeout))
        .with_cancel_flag(cancel);

    let path = fallback.fetch(&args.request, &global.fetch_options())?;
    println!("{}", path.display());
    Ok(())
}

fn fallback_config(queue_timeout: Option<u64>, build_timeout: Option<u64>) -> FallbackConfig {
    let mut config = FallbackConfig::default();
    if let Some(secs) = queue_timeout {
        config.queue_poll = config.queue_poll.with_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = build_timeout {
        config.build_poll = config.build_poll.with_timeout(Duration::from_secs(secs));
    }
    config
}
