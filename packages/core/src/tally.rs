//! Caller-side accumulation of batch results.
//!
//! The queue's progress snapshots leave `completed` and `failed` at zero.
//! A [`BatchTally`] is fed from completion notifications and fills them in.

use serde::{Deserialize, Serialize};

use crate::{CompressionResult, QueueProgress};

/// Running totals for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTally {
    pub completed: usize,
    pub failed: usize,
    /// Source bytes of completed jobs.
    pub original_bytes: u64,
    /// Output bytes of completed jobs.
    pub compressed_bytes: u64,
}

impl BatchTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one terminal notification into the totals.
    pub fn record(&mut self, original_size: u64, result: &CompressionResult) {
        match result {
            Ok(output) => {
                self.completed += 1;
                self.original_bytes += original_size;
                self.compressed_bytes += output.size_bytes;
            }
            Err(_) => self.failed += 1,
        }
    }

    /// Number of jobs that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// Copy the cumulative counts into a queue snapshot.
    pub fn apply(&self, progress: QueueProgress) -> QueueProgress {
        QueueProgress {
            completed: self.completed,
            failed: self.failed,
            ..progress
        }
    }

    /// Overall size reduction of completed jobs, in percent.
    pub fn savings_percent(&self) -> i64 {
        savings_percent(self.original_bytes, self.compressed_bytes)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Size reduction from `original` to `compressed`, rounded to a whole percent.
pub fn savings_percent(original: u64, compressed: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    let saved = original as f64 - compressed as f64;
    (saved / original as f64 * 100.0).round() as i64
}

/// Human-readable file size, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
