//! Tracing setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Error, error::Result};

/// Install a JSON tracing subscriber filtered by `service.log_level`
///
/// An unparsable level falls back to `info`. Installing twice in one process
/// is reported as [`Error::Tracing`].
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}

/// Flush and shut down tracing
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_reports_error() {
        let config = Config::default();
        // The first call may lose to another test's subscriber
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(Error::Tracing(_))));
        shutdown_tracing();
    }
}
