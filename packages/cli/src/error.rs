use std::path::PathBuf;

use actors::QueueError;
use squeeze_core::{ConfigError, IntakeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("queue stopped before every job finished")]
    Interrupted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
