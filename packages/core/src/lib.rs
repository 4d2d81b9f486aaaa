//! Core domain types for the image compression queue.
//!
//! This crate contains the types shared across all packages:
//! - Job, JobId and SourceImage for units of work
//! - CompressionOptions and CompressionOutput for the compressor contract
//! - Scheduler for admission, priority and retry bookkeeping
//! - Events, progress snapshots and caller-side tallies
//! - Plan limits checked before files are enqueued

mod compressor;
mod events;
mod intake;
mod job;
mod options;
mod queue;
mod scheduler;
mod source;
mod tally;

pub use compressor::{CompressFuture, Compressor, FnCompressor};
pub use events::QueueEvent;
pub use intake::{IntakeError, IntakeReport, PlanLimits, Rejection, check_file_count, check_intake};
pub use job::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_PENALTY, Job, JobId, Priority};
pub use options::{
    CompressionError, CompressionOptions, CompressionOutput, CompressionResult, Dimensions,
    OutputFormat,
};
pub use queue::{ConfigError, QueueConfig, QueueProgress, QueueState, QueueStatus};
pub use scheduler::{Dispatch, FailureOutcome, Scheduler};
pub use source::{SourceImage, SourceRef, mime_from_path};
pub use tally::{BatchTally, format_file_size, savings_percent};
