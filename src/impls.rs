//! Concrete implementations of producers and consumers.

pub mod consumers;
pub mod producers;

// Re-export commonly used implementations
pub use consumers::*;
pub use producers::*;
