#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actors::{ChannelObserver, CompressionQueue, QueueNotification};
use bytes::Bytes;
use squeeze_core::{
    CompressFuture, CompressionError, CompressionOptions, CompressionOutput, CompressionResult,
    Compressor, Dimensions, JobId, OutputFormat, QueueConfig, QueueProgress, SourceImage,
    SourceRef,
};
use tokio::sync::{Semaphore, mpsc};

const WAIT: Duration = Duration::from_secs(5);

/// What a scripted call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

type Script = Arc<dyn Fn(&SourceImage, u32) -> Behavior + Send + Sync>;

/// Compressor whose outcome is decided per call by a script.
///
/// A gated compressor blocks every call until the test releases a permit.
#[derive(Clone)]
pub struct ScriptedCompressor {
    script: Script,
    gate: Option<Arc<Semaphore>>,
    calls: Arc<Mutex<HashMap<JobId, u32>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedCompressor {
    /// `script` receives the source and the 1-based call number for its id.
    pub fn new(script: impl Fn(&SourceImage, u32) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            gate: None,
            calls: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(|_, _| Behavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::new(|_, _| Behavior::Fail)
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` blocked calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls_for(&self, id: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&JobId::from(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Compressor for ScriptedCompressor {
    fn name(&self) -> &str {
        "scripted"
    }

    fn compress(&self, source: SourceRef, options: CompressionOptions) -> CompressFuture {
        let this = self.clone();
        Box::pin(async move {
            let now = this.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            this.peak.fetch_max(now, Ordering::SeqCst);

            let call = {
                let mut calls = this.calls.lock().unwrap();
                let count = calls.entry(source.id.clone()).or_insert(0);
                *count += 1;
                *count
            };

            if let Some(gate) = &this.gate {
                gate.acquire().await.unwrap().forget();
            }
            tokio::task::yield_now().await;

            let behavior = (this.script)(&source, call);
            this.in_flight.fetch_sub(1, Ordering::SeqCst);

            match behavior {
                Behavior::Succeed => Ok(CompressionOutput {
                    payload: Bytes::from_static(b"compressed"),
                    size_bytes: source.size() / 2,
                    format: OutputFormat::Jpeg,
                    original_dimensions: Dimensions::new(10, 10),
                    output_dimensions: Dimensions::new(10, 10),
                    compression_ratio: 2.0,
                    quality: options.quality,
                    preview: None,
                }),
                Behavior::Fail => Err(CompressionError::Encode(format!(
                    "scripted failure #{call} for {}",
                    source.name
                ))),
                Behavior::Panic => panic!("scripted panic for {}", source.name),
            }
        })
    }
}

/// A 100-byte source whose job id equals `name`.
pub fn source(name: &str) -> SourceRef {
    SourceImage::new(format!("{name}.jpg"), vec![0u8; 100])
        .with_id(name)
        .into_ref()
}

pub fn sources(names: &[&str]) -> Vec<SourceRef> {
    names.iter().map(|n| source(n)).collect()
}

pub async fn spawn_queue(
    config: QueueConfig,
    compressor: &ScriptedCompressor,
) -> (CompressionQueue, Notifications) {
    let (observer, rx) = ChannelObserver::channel();
    let queue = CompressionQueue::spawn(config, Arc::new(compressor.clone()), Arc::new(observer))
        .await
        .unwrap();
    (queue, Notifications::new(rx))
}

/// Everything the observer has seen so far.
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<QueueNotification>,
    pub seen: Vec<QueueNotification>,
}

impl Notifications {
    pub fn new(rx: mpsc::UnboundedReceiver<QueueNotification>) -> Self {
        Self {
            rx,
            seen: Vec::new(),
        }
    }

    /// Receive until `done` holds for the collected notifications.
    pub async fn wait_until(&mut self, done: impl Fn(&Self) -> bool) {
        tokio::time::timeout(WAIT, async {
            while !done(self) {
                let next = self.rx.recv().await.expect("observer channel closed");
                self.seen.push(next);
            }
        })
        .await
        .expect("timed out waiting for queue notifications");
    }

    pub async fn wait_for_starts(&mut self, n: usize) {
        self.wait_until(|s| s.started().len() >= n).await;
    }

    pub async fn wait_for_completions(&mut self, n: usize) {
        self.wait_until(|s| s.completions().len() >= n).await;
    }

    /// Pull in whatever is already buffered.
    pub fn drain(&mut self) {
        while let Ok(next) = self.rx.try_recv() {
            self.seen.push(next);
        }
    }

    pub fn started(&self) -> Vec<(String, u32)> {
        self.seen
            .iter()
            .filter_map(|n| match n {
                QueueNotification::Started { job_id, attempt } => {
                    Some((job_id.to_string(), *attempt))
                }
                _ => None,
            })
            .collect()
    }

    pub fn started_ids(&self) -> Vec<String> {
        self.started().into_iter().map(|(id, _)| id).collect()
    }

    pub fn completions(&self) -> Vec<(String, CompressionResult)> {
        self.seen
            .iter()
            .filter_map(|n| match n {
                QueueNotification::Complete { job_id, result } => {
                    Some((job_id.to_string(), result.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<QueueProgress> {
        self.seen
            .iter()
            .filter_map(|n| match n {
                QueueNotification::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

/// Poll status until nothing is waiting or active.
pub async fn wait_idle(queue: &CompressionQueue) {
    tokio::time::timeout(WAIT, async {
        loop {
            if queue.status().await.unwrap().is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queue never went idle");
}
