//! Caller-facing handle for a running compression queue.

use std::sync::Arc;

use ractor::{Actor, ActorRef, RpcReplyPort};
use squeeze_core::{
    CompressionOptions, Compressor, Job, JobId, Priority, QueueConfig, QueueEvent, QueueStatus,
    SourceRef,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::messages::{QueueError, QueueMessage};
use crate::observer::QueueObserver;
use crate::queue_actor::{QueueActor, QueueArgs};

const EVENT_CAPACITY: usize = 1024;

/// A bounded-concurrency compression queue.
///
/// Dropping the handle stops the queue. In-flight compression calls run to
/// completion but their results are discarded.
pub struct CompressionQueue {
    actor: ActorRef<QueueMessage>,
    config: QueueConfig,
    event_tx: broadcast::Sender<QueueEvent>,
    join: Option<JoinHandle<()>>,
}

impl CompressionQueue {
    /// Spawn a queue actor.
    pub async fn spawn(
        config: QueueConfig,
        compressor: Arc<dyn Compressor>,
        observer: Arc<dyn QueueObserver>,
    ) -> Result<Self, QueueError> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let args = QueueArgs {
            config: config.clone(),
            compressor,
            observer,
            event_tx: event_tx.clone(),
        };

        let (actor, join) = Actor::spawn(None, QueueActor, args)
            .await
            .map_err(|e| QueueError::Spawn(e.to_string()))?;

        Ok(Self {
            actor,
            config,
            event_tx,
            join: Some(join),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Enqueue files in order. The first file gets priority 0, the next 1,
    /// and so on. Returns the number of jobs accepted; files whose id is
    /// already queued are skipped.
    pub async fn enqueue_batch(
        &self,
        files: Vec<SourceRef>,
        options: CompressionOptions,
    ) -> Result<usize, QueueError> {
        let jobs = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| self.job(file, &options, index as Priority))
            .collect();
        self.call(|reply| QueueMessage::Enqueue { jobs, reply }).await
    }

    /// Enqueue a single file at an explicit priority.
    pub async fn enqueue_one(
        &self,
        file: SourceRef,
        options: CompressionOptions,
        priority: Priority,
    ) -> Result<bool, QueueError> {
        let jobs = vec![self.job(file, &options, priority)];
        let accepted = self.call(|reply| QueueMessage::Enqueue { jobs, reply }).await?;
        Ok(accepted == 1)
    }

    /// Change the priority of a waiting job. Returns false if the job is
    /// not waiting.
    pub async fn set_priority(&self, job_id: &JobId, priority: Priority) -> Result<bool, QueueError> {
        let job_id = job_id.clone();
        self.call(|reply| QueueMessage::SetPriority {
            job_id,
            priority,
            reply,
        })
        .await
    }

    /// Stop admitting work. In-flight jobs still finish.
    pub fn pause(&self) -> Result<(), QueueError> {
        self.cast(QueueMessage::Pause)
    }

    pub fn resume(&self) -> Result<(), QueueError> {
        self.cast(QueueMessage::Resume)
    }

    /// Discard all waiting work. Results of in-flight calls are ignored.
    pub fn clear(&self) -> Result<(), QueueError> {
        self.cast(QueueMessage::Clear)
    }

    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        self.call(|reply| QueueMessage::GetStatus { reply }).await
    }

    /// Stop the queue and wait for the actor to exit.
    pub async fn shutdown(mut self) -> Result<(), QueueError> {
        self.cast(QueueMessage::Shutdown)?;
        if let Some(join) = self.join.take() {
            join.await.map_err(|e| QueueError::Messaging(e.to_string()))?;
        }
        Ok(())
    }

    fn job(&self, file: SourceRef, options: &CompressionOptions, priority: Priority) -> Job {
        let mut options = options.clone();
        if self.config.force_web_optimized {
            options.web_optimized = true;
        }
        Job::new(file, options)
            .with_priority(priority)
            .with_max_retries(self.config.max_retries)
    }

    fn cast(&self, message: QueueMessage) -> Result<(), QueueError> {
        self.actor
            .send_message(message)
            .map_err(|e| QueueError::Messaging(e.to_string()))
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(RpcReplyPort<T>) -> QueueMessage,
    ) -> Result<T, QueueError>
    where
        T: Send + 'static,
    {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.cast(build(tx.into()))?;
        rx.await.map_err(|_| QueueError::NoReply)
    }
}

impl Drop for CompressionQueue {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.actor.stop(None);
        }
    }
}
