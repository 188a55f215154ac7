//! Tracing subscriber setup for hosts embedding the crate.

use tracing::info;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use super::config::LoggingConfig;

/// Installs a global subscriber writing to the configured log file.
///
/// `RUST_LOG` overrides the configured level. Calling this again after a
/// subscriber is installed is a no-op.
///
/// # Errors
/// Returns error if the log file or its directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default()
            .add_directive(LevelFilter::from_level(config.level.to_tracing_level()).into())
    });

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        if tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .try_init()
            .is_ok()
        {
            info!(path = %log_path.display(), "Logging initialized");
        }
    } else {
        let _ = tracing_subscriber::registry().with(filter).try_init();
    }

    Ok(())
}
