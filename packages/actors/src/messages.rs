//! Message types for the queue actor.

use chrono::{DateTime, Utc};
use ractor::RpcReplyPort;
use squeeze_core::{CompressionResult, ConfigError, Job, JobId, Priority, QueueStatus};

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Add jobs to the waiting list. Replies with the number accepted.
    Enqueue {
        jobs: Vec<Job>,
        reply: RpcReplyPort<usize>,
    },

    /// Change the priority of a waiting job.
    SetPriority {
        job_id: JobId,
        priority: Priority,
        reply: RpcReplyPort<bool>,
    },

    /// Stop admitting new work.
    Pause,

    /// Resume admitting work.
    Resume,

    /// Discard waiting work and forget in-flight bookkeeping.
    Clear,

    /// Get a point-in-time status.
    GetStatus { reply: RpcReplyPort<QueueStatus> },

    /// A compression call returned.
    JobFinished {
        job_id: JobId,
        generation: u64,
        started_at: DateTime<Utc>,
        result: CompressionResult,
    },

    /// Stop the actor.
    Shutdown,
}

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to start queue: {0}")]
    Spawn(String),

    #[error("Queue is not running: {0}")]
    Messaging(String),

    #[error("Queue dropped the reply")]
    NoReply,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
