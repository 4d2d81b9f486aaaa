//! Queue actor that owns the scheduler and runs compression calls.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use squeeze_core::{
    CompressionError, CompressionResult, Compressor, Dispatch, FailureOutcome, JobId, QueueConfig,
    QueueEvent, QueueState, Scheduler,
};
use tokio::sync::broadcast;

use crate::messages::QueueMessage;
use crate::observer::QueueObserver;

/// Arguments for starting a queue actor.
pub struct QueueArgs {
    pub config: QueueConfig,
    pub compressor: Arc<dyn Compressor>,
    pub observer: Arc<dyn QueueObserver>,
    pub event_tx: broadcast::Sender<QueueEvent>,
}

/// State for the queue actor.
pub struct QueueActorState {
    scheduler: Scheduler,
    compressor: Arc<dyn Compressor>,
    observer: Arc<dyn QueueObserver>,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl QueueActorState {
    fn new(args: QueueArgs) -> Self {
        Self {
            scheduler: Scheduler::new(args.config),
            compressor: args.compressor,
            observer: args.observer,
            event_tx: args.event_tx,
        }
    }

    /// Broadcast an event.
    fn broadcast(&self, event: QueueEvent) {
        self.observer.on_event(&event);
        let _ = self.event_tx.send(event);
    }

    fn emit_progress(&self) {
        let progress = self.scheduler.progress();
        self.observer.on_progress(progress);
        self.broadcast(QueueEvent::Progress {
            progress,
            timestamp: Utc::now(),
        });
    }

    /// Start as many waiting jobs as the free slots allow.
    fn run_admission(&mut self, myself: &ActorRef<QueueMessage>) {
        let dispatched = self.scheduler.admit();
        if dispatched.is_empty() {
            return;
        }

        for dispatch in dispatched {
            self.start(myself, dispatch);
        }
        self.emit_progress();
    }

    fn start(&self, myself: &ActorRef<QueueMessage>, dispatch: Dispatch) {
        let Dispatch { job, generation } = dispatch;
        let attempt = job.attempt();

        tracing::debug!("Starting job {} (attempt {})", job.id, attempt);
        self.observer.on_item_started(&job.id, attempt);
        self.broadcast(QueueEvent::JobStarted {
            job_id: job.id.clone(),
            attempt,
            timestamp: Utc::now(),
        });

        let compressor = Arc::clone(&self.compressor);
        let myself = myself.clone();
        let started_at = Utc::now();
        let job_id = job.id;
        let source = job.source;
        let options = job.options;

        tokio::spawn(async move {
            let call = async move { compressor.compress(source, options).await };
            let result = match AssertUnwindSafe(call).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(CompressionError::Panicked(panic_message(panic.as_ref()))),
            };

            if let Err(e) = myself.send_message(QueueMessage::JobFinished {
                job_id,
                generation,
                started_at,
                result,
            }) {
                tracing::warn!("Queue stopped before a job finished: {}", e);
            }
        });
    }

    fn finish(
        &mut self,
        job_id: JobId,
        generation: u64,
        duration_ms: u64,
        result: CompressionResult,
    ) -> bool {
        match &result {
            Ok(output) => {
                let Some(job) = self.scheduler.succeed(&job_id, generation) else {
                    return false;
                };
                tracing::info!(
                    "Compressed {} to {} bytes ({:.2}x)",
                    job.source.name,
                    output.size_bytes,
                    output.compression_ratio
                );
                self.observer.on_item_complete(&job.id, &result);
                self.broadcast(QueueEvent::JobCompleted {
                    job_id: job.id,
                    size_bytes: output.size_bytes,
                    compression_ratio: output.compression_ratio,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(error) => match self.scheduler.fail(&job_id, generation) {
                None => return false,
                Some(FailureOutcome::Retrying(job)) => {
                    tracing::warn!(
                        "Job {} failed on attempt {}, retrying at priority {}: {}",
                        job.id,
                        job.retry_count,
                        job.priority,
                        error
                    );
                    self.broadcast(QueueEvent::JobRetrying {
                        job_id: job.id,
                        error: error.to_string(),
                        attempt: job.retry_count,
                        priority: job.priority,
                        timestamp: Utc::now(),
                    });
                }
                Some(FailureOutcome::Exhausted(job)) => {
                    tracing::error!(
                        "Job {} failed after {} attempts: {}",
                        job.id,
                        job.attempt(),
                        error
                    );
                    self.observer.on_item_complete(&job.id, &result);
                    self.broadcast(QueueEvent::JobFailed {
                        job_id: job.id.clone(),
                        error: error.to_string(),
                        attempts: job.attempt(),
                        timestamp: Utc::now(),
                    });
                }
            },
        }
        true
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "compressor panicked".to_string()
    }
}

/// Queue actor that manages waiting and in-flight compression jobs.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = QueueArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        args.config.validate()?;
        tracing::info!(
            "Starting compression queue: compressor={}, concurrency={}, max_retries={}",
            args.compressor.name(),
            args.config.concurrency_limit,
            args.config.max_retries
        );
        Ok(QueueActorState::new(args))
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Enqueue { jobs, reply } => {
                let priorities: Vec<_> = jobs
                    .iter()
                    .map(|j| {
                        let cap = state.scheduler.max_priority(j.max_retries);
                        (j.id.clone(), j.priority.min(cap))
                    })
                    .collect();
                let accepted = state.scheduler.enqueue(jobs);
                let count = accepted.len();
                let mut accepted: HashSet<JobId> = accepted.into_iter().collect();

                for (job_id, priority) in priorities {
                    if accepted.remove(&job_id) {
                        state.broadcast(QueueEvent::JobEnqueued {
                            job_id,
                            priority,
                            timestamp: Utc::now(),
                        });
                    }
                }
                tracing::info!("Enqueued {} jobs", count);

                state.emit_progress();
                state.run_admission(&myself);
                let _ = reply.send(count);
            }

            QueueMessage::SetPriority {
                job_id,
                priority,
                reply,
            } => {
                let changed = state.scheduler.set_priority(&job_id, priority);
                if changed {
                    tracing::debug!("Job {} priority set to {}", job_id, priority);
                }
                let _ = reply.send(changed);
            }

            QueueMessage::Pause => {
                if state.scheduler.pause() {
                    tracing::info!("Queue paused");
                    state.broadcast(QueueEvent::StateChanged {
                        old_state: QueueState::Running,
                        new_state: QueueState::Paused,
                        timestamp: Utc::now(),
                    });
                }
            }

            QueueMessage::Resume => {
                if state.scheduler.resume() {
                    tracing::info!("Queue resumed");
                    state.broadcast(QueueEvent::StateChanged {
                        old_state: QueueState::Paused,
                        new_state: QueueState::Running,
                        timestamp: Utc::now(),
                    });
                    state.run_admission(&myself);
                }
            }

            QueueMessage::Clear => {
                let was_paused = state.scheduler.is_paused();
                let discarded = state.scheduler.clear();
                tracing::info!("Queue cleared, {} jobs discarded", discarded);
                state.broadcast(QueueEvent::Cleared {
                    discarded,
                    timestamp: Utc::now(),
                });
                if was_paused {
                    state.broadcast(QueueEvent::StateChanged {
                        old_state: QueueState::Paused,
                        new_state: QueueState::Running,
                        timestamp: Utc::now(),
                    });
                }
                state.emit_progress();
            }

            QueueMessage::GetStatus { reply } => {
                let _ = reply.send(state.scheduler.status());
            }

            QueueMessage::JobFinished {
                job_id,
                generation,
                started_at,
                result,
            } => {
                let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
                if !state.finish(job_id.clone(), generation, duration_ms, result) {
                    tracing::debug!("Ignoring stale completion for job {}", job_id);
                    return Ok(());
                }
                state.emit_progress();
                state.run_admission(&myself);
            }

            QueueMessage::Shutdown => {
                tracing::info!("Shutting down compression queue");
                myself.stop(None);
            }
        }

        Ok(())
    }
}
