//! Plan limits applied before files reach the queue.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SourceRef, format_file_size};

const MIB: u64 = 1024 * 1024;

/// Limits granted by the user's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    /// Maximum number of files held at once. `None` is unlimited.
    pub max_files: Option<usize>,
    /// Maximum size of a single file in bytes.
    pub max_file_size: u64,
}

impl PlanLimits {
    pub fn free() -> Self {
        Self {
            max_files: Some(10),
            max_file_size: 10 * MIB,
        }
    }

    pub fn basic() -> Self {
        Self {
            max_files: Some(100),
            max_file_size: 25 * MIB,
        }
    }

    pub fn starter() -> Self {
        Self {
            max_files: None,
            max_file_size: 50 * MIB,
        }
    }

    pub fn pro() -> Self {
        Self {
            max_files: None,
            max_file_size: 100 * MIB,
        }
    }

    /// Look up a plan by id, ignoring a `-monthly`/`-yearly` suffix.
    pub fn for_plan(plan_id: &str) -> Option<Self> {
        let name = plan_id
            .trim()
            .trim_end_matches("-monthly")
            .trim_end_matches("-yearly")
            .to_ascii_lowercase();
        match name.as_str() {
            "free" => Some(Self::free()),
            "basic" => Some(Self::basic()),
            "starter" => Some(Self::starter()),
            "pro" => Some(Self::pro()),
            _ => None,
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::free()
    }
}

/// Batch-level intake failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("Your plan allows up to {limit} files, {requested} requested")]
    TooManyFiles { limit: usize, requested: usize },
}

/// Why a single file was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{name}: not an image")]
    NotAnImage { name: String },

    #[error("{name}: file size exceeds {limit} limit")]
    TooLarge { name: String, limit: String },
}

impl Rejection {
    /// Check one file's type and size without needing its contents.
    pub fn check(
        name: &str,
        mime_type: Option<&str>,
        size: u64,
        limits: &PlanLimits,
    ) -> Option<Self> {
        if !mime_type.is_some_and(|m| m.starts_with("image/")) {
            tracing::warn!("Rejecting {}: not an image", name);
            return Some(Self::NotAnImage {
                name: name.to_string(),
            });
        }
        if size > limits.max_file_size {
            tracing::warn!("Rejecting {}: {} bytes", name, size);
            return Some(Self::TooLarge {
                name: name.to_string(),
                limit: format_file_size(limits.max_file_size),
            });
        }
        None
    }
}

/// Files that passed intake, plus the ones that did not.
#[derive(Debug, Clone, Default)]
pub struct IntakeReport {
    pub accepted: Vec<SourceRef>,
    pub rejected: Vec<Rejection>,
}

/// Validate a batch against plan limits.
///
/// `already_held` is the number of files the user already has in their
/// list. Exceeding the file count rejects the whole batch; type and size
/// problems reject only the offending file.
pub fn check_intake(
    already_held: usize,
    files: Vec<SourceRef>,
    limits: &PlanLimits,
) -> Result<IntakeReport, IntakeError> {
    check_file_count(already_held, files.len(), limits)?;

    let mut report = IntakeReport::default();
    for file in files {
        match Rejection::check(&file.name, file.mime_type.as_deref(), file.size(), limits) {
            Some(rejection) => report.rejected.push(rejection),
            None => report.accepted.push(file),
        }
    }

    Ok(report)
}

/// Fails when adding `incoming` files to `already_held` would exceed the plan.
pub fn check_file_count(
    already_held: usize,
    incoming: usize,
    limits: &PlanLimits,
) -> Result<(), IntakeError> {
    if let Some(limit) = limits.max_files {
        let requested = already_held + incoming;
        if requested > limit {
            return Err(IntakeError::TooManyFiles { limit, requested });
        }
    }
    Ok(())
}
