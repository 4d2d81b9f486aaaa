//! Batch driver: intake, queue, wait, write.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use actors::{ChannelObserver, CompressionQueue, QueueNotification};
use codec::{CodecConfig, ImageCompressor};
use serde::Serialize;
use squeeze_core::{
    BatchTally, JobId, OutputFormat, PlanLimits, QueueConfig, Rejection, SourceImage, SourceRef,
    check_file_count, check_intake, format_file_size, mime_from_path,
};

use crate::{Args, CliError};

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_files: usize,
    pub completed: usize,
    pub failed: usize,
    pub original_size: u64,
    pub compressed_size: u64,
    pub savings_percent: i64,
    pub outputs: Vec<PathBuf>,
    pub rejected: Vec<String>,
    pub failures: Vec<String>,
}

impl Summary {
    fn from_tally(tally: &BatchTally, total_files: usize) -> Self {
        Self {
            total_files,
            completed: tally.completed,
            failed: tally.failed,
            original_size: tally.original_bytes,
            compressed_size: tally.compressed_bytes,
            savings_percent: tally.savings_percent(),
            ..Self::default()
        }
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        let mut out = format!("Compressed {} of {} files\n", self.completed, self.total_files);
        if self.completed > 0 {
            out.push_str(&format!(
                "  {} -> {} ({}% smaller)\n",
                format_file_size(self.original_size),
                format_file_size(self.compressed_size),
                self.savings_percent
            ));
        }
        for path in &self.outputs {
            out.push_str(&format!("  wrote {}\n", path.display()));
        }
        for reason in &self.rejected {
            out.push_str(&format!("  skipped {reason}\n"));
        }
        for reason in &self.failures {
            out.push_str(&format!("  failed {reason}\n"));
        }
        out
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.rejected.is_empty()
    }
}

/// Picks output paths that collide neither with each other nor with files
/// already in the output directory.
#[derive(Debug)]
struct OutputNames {
    dir: PathBuf,
    taken: HashSet<String>,
}

impl OutputNames {
    fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            taken: HashSet::new(),
        }
    }

    async fn next(&mut self, source_name: &str, format: OutputFormat) -> PathBuf {
        let stem = Path::new(source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_string());

        let mut candidate = format!("{stem}.{}", format.extension());
        let mut n = 2;
        while !self.is_free(&candidate).await {
            candidate = format!("{stem}-{n}.{}", format.extension());
            n += 1;
        }
        self.taken.insert(candidate.clone());
        self.dir.join(candidate)
    }

    async fn is_free(&self, name: &str) -> bool {
        !self.taken.contains(name)
            && !tokio::fs::try_exists(self.dir.join(name))
                .await
                .unwrap_or(false)
    }
}

/// Read the inputs, turning away files that fail the plan's type or size
/// check before their contents are loaded.
async fn load_sources(
    paths: &[PathBuf],
    limits: &PlanLimits,
) -> Result<(Vec<SourceRef>, Vec<Rejection>), CliError> {
    let mut sources = Vec::with_capacity(paths.len());
    let mut rejected = Vec::new();
    for path in paths {
        let read_error = |source| CliError::Read {
            path: path.clone(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Some(rejection) = Rejection::check(&name, mime_from_path(path), size, limits) {
            rejected.push(rejection);
            continue;
        }

        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        sources.push(SourceImage::new(name, bytes).into_ref());
    }
    Ok((sources, rejected))
}

/// Compress every input and write the results to the output directory.
pub async fn run(
    args: &Args,
    config: QueueConfig,
    codec_config: CodecConfig,
) -> Result<Summary, CliError> {
    let limits =
        PlanLimits::for_plan(&args.plan).ok_or_else(|| CliError::UnknownPlan(args.plan.clone()))?;

    let total_files = args.inputs.len();
    check_file_count(0, total_files, &limits)?;

    let (files, mut rejections) = load_sources(&args.inputs, &limits).await?;
    // Sizes are checked again against the bytes actually read.
    let report = check_intake(0, files, &limits)?;
    rejections.extend(report.rejected);
    let rejected: Vec<String> = rejections.iter().map(ToString::to_string).collect();

    if report.accepted.is_empty() {
        tracing::warn!("No files left to compress");
        return Ok(Summary {
            total_files,
            rejected,
            ..Summary::default()
        });
    }

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .map_err(|source| CliError::Write {
            path: args.out_dir.clone(),
            source,
        })?;

    let originals: HashMap<JobId, SourceRef> = report
        .accepted
        .iter()
        .map(|s| (s.id.clone(), Arc::clone(s)))
        .collect();

    let (observer, mut rx) = ChannelObserver::channel();
    let queue = CompressionQueue::spawn(
        config,
        Arc::new(ImageCompressor::new(codec_config)),
        Arc::new(observer),
    )
    .await?;
    let expected = queue.enqueue_batch(report.accepted, args.options()).await?;
    tracing::info!("Compressing {} files", expected);

    let mut tally = BatchTally::new();
    let mut names = OutputNames::new(&args.out_dir);
    let mut outputs = Vec::new();
    let mut failures = Vec::new();

    while tally.finished() < expected {
        match rx.recv().await {
            None => return Err(CliError::Interrupted),
            Some(QueueNotification::Progress(progress)) => {
                let progress = tally.apply(progress);
                tracing::debug!(
                    "{} of {} done, {} in flight",
                    progress.completed + progress.failed,
                    expected,
                    progress.current
                );
            }
            Some(QueueNotification::Started { job_id, attempt }) => {
                if attempt > 1 {
                    tracing::debug!("Retrying {} (attempt {})", job_id, attempt);
                }
            }
            Some(QueueNotification::Complete { job_id, result }) => {
                let Some(source) = originals.get(&job_id) else {
                    continue;
                };
                tally.record(source.size(), &result);

                match result {
                    Ok(output) => {
                        let path = names.next(&source.name, output.format).await;
                        tokio::fs::write(&path, &output.payload)
                            .await
                            .map_err(|e| CliError::Write {
                                path: path.clone(),
                                source: e,
                            })?;
                        tracing::info!(
                            "{}: {} -> {}",
                            source.name,
                            format_file_size(source.size()),
                            format_file_size(output.size_bytes)
                        );
                        outputs.push(path);
                    }
                    Err(e) => {
                        tracing::error!("{}: {}", source.name, e);
                        failures.push(format!("{}: {}", source.name, e));
                    }
                }
            }
        }
    }

    queue.shutdown().await?;

    Ok(Summary {
        outputs,
        rejected,
        failures,
        ..Summary::from_tally(&tally, total_files)
    })
}
