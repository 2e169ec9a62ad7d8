//! Parallel for-each example
//!
//! Run with: cargo run --example parallel

use handoff::parallel::{self, ParallelConfig};
use handoff::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<()> {
    let total = Arc::new(AtomicU64::new(0));

    let op = {
        let total = Arc::clone(&total);
        operation_from_fn(move |n: u64| {
            let total = Arc::clone(&total);
            async move {
                // Simulate I/O-bound work of uneven length
                sleep(Duration::from_millis(n % 7)).await;
                total.fetch_add(n, Ordering::Relaxed);
                Ok::<_, Error>(())
            }
        })
    };

    let config = ParallelConfig::default().workers(8).buffer_capacity(32);
    let started = Instant::now();
    parallel::for_each_with_config((1..=500u64).collect::<Vec<_>>(), op, &config).await?;

    println!(
        "Summed {} in {:?} with {} workers",
        total.load(Ordering::Relaxed),
        started.elapsed(),
        config.workers
    );
    Ok(())
}
