//! Basic example: loggers, `Every` policies and diagnostic context.
//!
//! Writes to standard output with the default formatter.

use logm::{DiagnosticMap, DiagnosticStack, Every, LoggerFactory, Marker};
use std::io;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Timeout;

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("upstream timed out")
    }
}

impl std::error::Error for Timeout {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let factory = LoggerFactory::builder().with_history_capacity(1_000).build()?;
    let logger = factory.logger("demo::server").with_marker(Marker::new("http"));

    println!("=== Basic Logging Example ===\n");

    logger.info().log_with("server starting")?;

    println!("\nEmitting 10 identical warnings, one written then two skipped:");
    for _ in 0..10 {
        logger
            .warn()
            .with_every(Every::times(2))
            .log_with("connection pool is busy")?;
    }

    println!("\nEmitting 5 warnings within one second, only the first is written:");
    for _ in 0..5 {
        logger
            .warn()
            .with_every(Every::period(Duration::from_secs(1)))
            .log_with("cache miss storm")?;
    }

    println!("\nDiagnostic context on a worker thread:");
    let _request = DiagnosticMap::current()
        .install(&[("request", "r-17"), ("tenant", "acme")].into_iter().collect());
    let _scope = DiagnosticStack::current().push_scope("handle");

    let worker = logger.clone();
    let task = DiagnosticMap::current().wrap(DiagnosticStack::current().wrap(move || {
        let _scope = DiagnosticStack::current().push_scope("fetch");
        worker
            .severe()
            .with_cause(logm::Cause::new(io::Error::new(io::ErrorKind::Other, Timeout)))
            .log_with("request failed")
    }));
    thread::spawn(task).join().map_err(|_| "worker panicked")??;

    let snapshot = factory.metrics().snapshot();
    println!("\n=== Example Complete ===");
    println!(
        "Written: {}, suppressed: {}, kept in history: {}",
        snapshot.events_emitted,
        snapshot.events_suppressed,
        factory.history().map_or(0, |history| history.len())
    );

    Ok(())
}
