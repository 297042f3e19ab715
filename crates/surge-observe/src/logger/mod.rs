mod build;
mod config;
mod error;
mod format;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => build::text(cfg),
        LoggerFormat::Json => build::json(cfg),
        LoggerFormat::Journald => build::journald(cfg),
    }
}
