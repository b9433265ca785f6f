//! # chunked_queue
//!
//! A thread-safe, unbounded FIFO queue that stores its elements in a chain of
//! fixed-size arrays instead of one linked node per element.
//!
//! Producers append into the tail chunk and link a new one when it fills;
//! consumers read from the head chunk and release it once it is drained. A
//! single lock serializes every operation, and no operation ever waits for
//! data: an empty queue answers `None`.
//!
//! ```
//! use chunked_queue::ChunkedQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(ChunkedQueue::new());
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..1000 {
//!             queue.put(i);
//!         }
//!     })
//! };
//! producer.join().unwrap();
//!
//! let drained: Vec<i32> = queue.drain().collect();
//! assert_eq!(drained, (0..1000).collect::<Vec<_>>());
//! ```

mod chunk;
mod common;
mod err;

pub mod chunked_queue;

// Re-exports for convenience
pub use chunked_queue::{ChunkedQueue, Drain, IntoIter};
pub use common::QueueOps;
pub use err::{Error, PutError};

/// Number of element slots per chunk when no capacity is given
pub const DEFAULT_CHUNK_CAPACITY: usize = 128;
