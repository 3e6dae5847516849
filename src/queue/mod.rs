// Queue management module
// This module handles playback queues and their background persistence

pub mod manager;
pub mod multi_queue;
pub mod persistence;

pub use manager::{AddQueueOptions, QueueBoard};
pub use multi_queue::{MultiQueue, PosCheck};
pub use persistence::{PersistJob, QueuePersister};
