//! Event types for progress reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, Priority, QueueProgress, QueueState};

/// Events emitted by a compression queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// A new progress snapshot.
    Progress {
        progress: QueueProgress,
        timestamp: DateTime<Utc>,
    },
    /// The queue was paused or resumed.
    StateChanged {
        old_state: QueueState,
        new_state: QueueState,
        timestamp: DateTime<Utc>,
    },
    /// Waiting work was discarded.
    Cleared {
        discarded: usize,
        timestamp: DateTime<Utc>,
    },

    /// A job joined the waiting list.
    JobEnqueued {
        job_id: JobId,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },
    /// A job was admitted and its compression call started.
    JobStarted {
        job_id: JobId,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// A job finished successfully.
    JobCompleted {
        job_id: JobId,
        size_bytes: u64,
        compression_ratio: f64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A failed attempt was put back in the waiting list.
    JobRetrying {
        job_id: JobId,
        error: String,
        attempt: u32,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },
    /// A job ran out of retries.
    JobFailed {
        job_id: JobId,
        error: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            QueueEvent::Progress { timestamp, .. } => *timestamp,
            QueueEvent::StateChanged { timestamp, .. } => *timestamp,
            QueueEvent::Cleared { timestamp, .. } => *timestamp,
            QueueEvent::JobEnqueued { timestamp, .. } => *timestamp,
            QueueEvent::JobStarted { timestamp, .. } => *timestamp,
            QueueEvent::JobCompleted { timestamp, .. } => *timestamp,
            QueueEvent::JobRetrying { timestamp, .. } => *timestamp,
            QueueEvent::JobFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            QueueEvent::JobEnqueued { job_id, .. } => Some(job_id),
            QueueEvent::JobStarted { job_id, .. } => Some(job_id),
            QueueEvent::JobCompleted { job_id, .. } => Some(job_id),
            QueueEvent::JobRetrying { job_id, .. } => Some(job_id),
            QueueEvent::JobFailed { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Whether this event ends a job's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueEvent::JobCompleted { .. } | QueueEvent::JobFailed { .. }
        )
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            QueueEvent::Progress { progress, .. } => format!(
                "Progress: {} active of {}{}",
                progress.current,
                progress.total,
                if progress.processing { "" } else { " (idle)" }
            ),
            QueueEvent::StateChanged { new_state, .. } => format!("Queue -> {}", new_state),
            QueueEvent::Cleared { discarded, .. } => {
                format!("Queue cleared, {} jobs discarded", discarded)
            }
            QueueEvent::JobEnqueued {
                job_id, priority, ..
            } => format!("Job {} enqueued at priority {}", job_id, priority),
            QueueEvent::JobStarted {
                job_id, attempt, ..
            } => format!("Job {} started (attempt {})", job_id, attempt),
            QueueEvent::JobCompleted {
                job_id,
                size_bytes,
                duration_ms,
                ..
            } => format!(
                "Job {} completed in {}ms ({} bytes)",
                job_id, duration_ms, size_bytes
            ),
            QueueEvent::JobRetrying {
                job_id,
                error,
                attempt,
                ..
            } => format!("Job {} failed: {} (retry {} queued)", job_id, error, attempt),
            QueueEvent::JobFailed {
                job_id,
                error,
                attempts,
                ..
            } => format!("Job {} failed after {} attempts: {}", job_id, attempts, error),
        }
    }
}
