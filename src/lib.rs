//! # Bounded Producer/Consumer Engine for Rust
//!
//! This crate runs any number of producers and consumers over a single
//! bounded buffer and returns once every producer has finished and every
//! consumer has drained. A parallel for-each is built on top of it.
//!
//! ## Core Concepts
//!
//! - **Producer**: Emits items into a write-only [`Production`] handle
//! - **Consumer**: Drains a single-pass [`Consumables`] view that ends at its terminator
//! - **Operation**: Per-item work applied by the parallel for-each
//! - **ProducerConsumer**: Runs producers to completion, then sends one terminator per consumer
//!
//! A producer or consumer that fails or panics is logged and counted as
//! finished; it never blocks the rest of the run. Cancellation is the only
//! way a run ends early.
//!
//! ## Example
//!
//! ```rust
//! use handoff::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let collector = CollectConsumer::new();
//!     let collector_ref = collector.clone();
//!
//!     ProducerConsumer::builder()
//!         .add_producer(IterProducer::new(1..=3))
//!         .add_consumer(collector)
//!         .buffer_capacity(10)
//!         .build()?
//!         .begin()
//!         .await?;
//!
//!     assert_eq!(collector_ref.into_items().await, vec![1, 2, 3]);
//!     Ok(())
//! }
//! ```

mod channel;
mod item;

pub mod consumables;
pub mod engine;
pub mod error;
pub mod impls;
pub mod metrics;
pub mod parallel;
pub mod production;
pub mod traits;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::consumables::Consumables;
    pub use crate::engine::{Builder, EngineConfig, ProducerConsumer, RunReport};
    pub use crate::error::{Error, Result};
    pub use crate::impls::{consumers::*, producers::*};
    pub use crate::parallel::{for_each, for_each_with, ParallelConfig};
    pub use crate::production::Production;
    pub use crate::traits::{Consumer, Operation, Producer};
    pub use crate::util::{consumer_from_fn, operation_from_fn, producer_from_fn};
}

pub use channel::UNBOUNDED;
pub use consumables::Consumables;
pub use engine::{ProducerConsumer, RunReport};
pub use error::{Error, Result};
pub use production::Production;
pub use traits::{Consumer, Operation, Producer};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
