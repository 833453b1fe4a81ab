use crate::error::SinkError;
use crate::record::Record;

#[cfg(feature = "buffered")]
use async_trait::async_trait;
#[cfg(feature = "buffered")]
use std::error::Error;

/// Destination for [`Record`]s produced by a [`Logger`](crate::Logger).
///
/// The logger calls `write` synchronously on the logging thread, once per log
/// call, for every attached sink in attachment order. A sink that needs to do
/// I/O in the background must keep its own queue and drain it in `sync`.
pub trait LogSink: Send + Sync {
    /// Render and emit a single record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` if the sink could not accept it. The logger reports the
    ///   failure and keeps delivering the record to the remaining sinks.
    fn write(&self, record: &Record) -> Result<(), SinkError>;

    /// Block until every record accepted so far has been flushed.
    ///
    /// Default implementation is a no-op.
    fn sync(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Asynchronous backend driven by a [`BufferedSink`](crate::buffered::BufferedSink).
///
/// Implementations transport records to a concrete backend (a database, a
/// collector, a message queue). They are called from a background Tokio task
/// and never from the logging thread.
#[cfg(feature = "buffered")]
#[async_trait]
pub trait AsyncLogSink: Send + Sync {
    /// Send a single record to the backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the record.
    /// - `Err(..)` if it failed; the buffered sink retries with backoff.
    async fn send(&self, record: &Record) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
