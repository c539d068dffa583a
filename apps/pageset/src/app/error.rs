use crate::config::ConfigError;
use crate::selection::ValidationError;
use crate::source::SourceError;
use crate::telemetry::logging::InitError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
}
