//! Job domain types for compression work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{CompressionOptions, SourceRef};

/// Unique identifier for a job.
///
/// A job shares its id with the file entry it was created from, so the UI
/// can map queue notifications back onto its own list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution priority. Lower values run first.
pub type Priority = i64;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default priority increment applied to a job that is being retried.
pub const DEFAULT_RETRY_PENALTY: Priority = 1000;

/// A single image's unit of compression work.
///
/// Jobs are treated as values: a retry produces a new `Job` through
/// [`Job::retried`] instead of mutating the one that failed.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique identifier, equal to the source file's id.
    pub id: JobId,
    /// Shared handle to the input image.
    pub source: SourceRef,
    /// Compression parameters.
    pub options: CompressionOptions,
    /// Position in the waiting set.
    pub priority: Priority,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    /// Maximum number of retries before the job fails for good.
    pub max_retries: u32,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job for a source image.
    pub fn new(source: SourceRef, options: CompressionOptions) -> Self {
        Self {
            id: source.id.clone(),
            source,
            options,
            priority: 0,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
        }
    }

    /// Set the priority for this job.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the max retries for this job.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 1-based number of the attempt this job represents.
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    /// Whether another attempt is allowed after a failure.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// The job as it should be re-queued after a failed attempt.
    pub fn retried(&self, penalty: Priority) -> Self {
        Self {
            priority: self.priority.saturating_add(penalty),
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}
