//! Basic usage examples for handoff
//!
//! Run with: cargo run --example basic

use async_trait::async_trait;
use handoff::prelude::*;
use std::time::Duration;
use tokio::time::sleep;

/// A producer that emits log lines for a named source
struct LineProducer {
    source: &'static str,
    lines: usize,
}

#[async_trait]
impl Producer for LineProducer {
    type Item = String;

    async fn produce(&mut self, production: Production<String>) -> Result<()> {
        for n in 0..self.lines {
            production.put(format!("{}: line {}", self.source, n)).await?;
        }
        Ok(())
    }
}

/// A consumer that prints what it receives, tagged with its worker id
struct PrintConsumer {
    worker: usize,
}

#[async_trait]
impl Consumer for PrintConsumer {
    type Item = String;

    async fn consume(&mut self, mut consumables: Consumables<String>) -> Result<()> {
        let mut handled = 0;
        while let Some(line) = consumables.next().await {
            println!("[worker {}] {}", self.worker, line);
            handled += 1;
            sleep(Duration::from_millis(5)).await;
        }
        println!("[worker {}] done after {} lines", self.worker, handled);
        Ok(())
    }
}

/// Example 1: Several producers, several consumers, small buffer
async fn fan_in_fan_out_example() -> Result<()> {
    println!("=== Fan-in / Fan-out ===");

    let report = ProducerConsumer::builder()
        .add_producer(LineProducer {
            source: "alpha",
            lines: 5,
        })
        .add_producer(LineProducer {
            source: "beta",
            lines: 5,
        })
        .add_consumers((0..3).map(|worker| PrintConsumer { worker }))
        .buffer_capacity(2)
        .build()?
        .begin()
        .await?;

    println!("{:?}\n", report);
    Ok(())
}

/// Example 2: Function-based components, one of which fails
async fn functional_example() -> Result<()> {
    println!("=== Functional Components ===");

    let flaky = producer_from_fn(|production: Production<u32>| async move {
        for n in 1..=10 {
            if n == 6 {
                return Err(Error::custom("sensor went offline"));
            }
            production.put(n).await?;
        }
        Ok(())
    });

    let summer = consumer_from_fn(|mut consumables: Consumables<u32>| async move {
        let mut total = 0;
        while let Some(n) = consumables.next().await {
            total += n;
        }
        println!("Sum of readings: {}", total);
        Ok::<_, Error>(())
    });

    let report = ProducerConsumer::builder()
        .add_producer(flaky)
        .add_consumer(summer)
        .build()?
        .begin()
        .await?;

    println!("Producer faults: {}\n", report.producer_faults);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fan_in_fan_out_example().await?;
    functional_example().await?;
    println!("All examples completed successfully!");
    Ok(())
}
