use std::sync::Arc;

use async_trait::async_trait;
use ctxlog::buffered::BufferedSink;
use ctxlog::{f, json, AsyncLogSink, BufferConfig, Context, Logger, Record};

/// Example of integrating a custom backend by implementing `AsyncLogSink`.
/// Imagine this talks to some database the crate has no sink for.
struct MyCustomDbSink;

#[async_trait]
impl AsyncLogSink for MyCustomDbSink {
    async fn send(&self, record: &Record) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let line = json::render(record)?;
        print!("[my-custom-db] {}", String::from_utf8_lossy(&line));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config = BufferConfig::from_env().unwrap_or_default();
    let (sink, handle) = BufferedSink::new(Arc::new(MyCustomDbSink), config);
    let logger = Logger::make(sink);

    let ctx = Context::background().with([f("db", "my-custom-db")]);
    for i in 0..10 {
        logger.info(&ctx, "custom backend example", [f("iteration", i)]);
    }

    let syncing = logger.clone();
    match tokio::task::spawn_blocking(move || syncing.sync()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => eprintln!("failed to flush logs: {err}"),
        Err(err) => eprintln!("sync task panicked: {err}"),
    }

    drop(logger);
    let _ = handle.await;
}
