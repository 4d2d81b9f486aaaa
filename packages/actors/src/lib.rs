//! Actor runtime for the compression queue.
//!
//! A single [`QueueActor`] owns the scheduler. Compression calls run on
//! spawned tasks and report back to the actor with a `JobFinished`
//! message, so all queue state changes happen on one mailbox.
//!
//! # Usage
//!
//! ```ignore
//! use actors::{CompressionQueue, ChannelObserver};
//!
//! let (observer, mut rx) = ChannelObserver::channel();
//! let queue = CompressionQueue::spawn(config, compressor, Arc::new(observer)).await?;
//! queue.enqueue_batch(files, CompressionOptions::for_web(80)).await?;
//! ```

mod handle;
mod messages;
mod observer;
mod queue_actor;

pub use handle::CompressionQueue;
pub use messages::{QueueError, QueueMessage};
pub use observer::{ChannelObserver, FnObserver, NoopObserver, QueueNotification, QueueObserver};
pub use queue_actor::{QueueActor, QueueArgs};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort};
