//! Observer trait through which the queue reports to its caller.

use squeeze_core::{CompressionResult, JobId, QueueEvent, QueueProgress};
use tokio::sync::mpsc;

/// Receives queue callbacks.
///
/// Callbacks run on the queue actor while it handles a message, so they
/// must be quick. Every job that is not discarded by a clear gets exactly
/// one `on_item_complete`.
pub trait QueueObserver: Send + Sync + 'static {
    /// A new progress snapshot.
    fn on_progress(&self, _progress: QueueProgress) {}

    /// A job was admitted and its compression call is starting.
    fn on_item_started(&self, _job_id: &JobId, _attempt: u32) {}

    /// A job reached a terminal state.
    fn on_item_complete(&self, _job_id: &JobId, _result: &CompressionResult) {}

    /// Any queue event, including the ones covered by the other callbacks.
    fn on_event(&self, _event: &QueueEvent) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl QueueObserver for NoopObserver {}

type ProgressFn = Box<dyn Fn(QueueProgress) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&JobId, &CompressionResult) + Send + Sync>;

/// A closure-based observer.
#[derive(Default)]
pub struct FnObserver {
    on_progress: Option<ProgressFn>,
    on_item_complete: Option<CompleteFn>,
}

impl FnObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn on_progress(mut self, f: impl Fn(QueueProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Set the completion callback.
    pub fn on_item_complete(
        mut self,
        f: impl Fn(&JobId, &CompressionResult) + Send + Sync + 'static,
    ) -> Self {
        self.on_item_complete = Some(Box::new(f));
        self
    }
}

impl QueueObserver for FnObserver {
    fn on_progress(&self, progress: QueueProgress) {
        if let Some(f) = &self.on_progress {
            f(progress);
        }
    }

    fn on_item_complete(&self, job_id: &JobId, result: &CompressionResult) {
        if let Some(f) = &self.on_item_complete {
            f(job_id, result);
        }
    }
}

/// Callback payloads forwarded by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum QueueNotification {
    Progress(QueueProgress),
    Started { job_id: JobId, attempt: u32 },
    Complete { job_id: JobId, result: CompressionResult },
}

/// Observer that forwards callbacks into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<QueueNotification>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<QueueNotification>) -> Self {
        Self { tx }
    }

    /// Create an observer together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QueueNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn forward(&self, notification: QueueNotification) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(notification);
    }
}

impl QueueObserver for ChannelObserver {
    fn on_progress(&self, progress: QueueProgress) {
        self.forward(QueueNotification::Progress(progress));
    }

    fn on_item_started(&self, job_id: &JobId, attempt: u32) {
        self.forward(QueueNotification::Started {
            job_id: job_id.clone(),
            attempt,
        });
    }

    fn on_item_complete(&self, job_id: &JobId, result: &CompressionResult) {
        self.forward(QueueNotification::Complete {
            job_id: job_id.clone(),
            result: result.clone(),
        });
    }
}
