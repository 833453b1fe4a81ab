use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::config::BufferConfig;
use crate::error::SinkError;
use crate::record::Record;
use crate::sink::{AsyncLogSink, LogSink};

enum Command {
    Record(Record),
    Flush(std_mpsc::Sender<Result<(), SinkError>>),
}

/// [`LogSink`] that hands records to an [`AsyncLogSink`] through a bounded
/// queue drained by a background Tokio task.
///
/// `write` never blocks: it enqueues the record, or rejects it with
/// [`SinkError::QueueFull`] once `channel_buffer` records are pending.
/// `sync` blocks the calling thread until every record accepted before it has
/// been sent and the backend flushed. It must not be called from a
/// current-thread runtime, which would never get to run the background task.
pub struct BufferedSink {
    sender: mpsc::UnboundedSender<Command>,
    capacity: usize,
    pending: Arc<AtomicUsize>,
    /// Total records offered to the sink.
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued.
    pub enqueued_events: Arc<AtomicU64>,
    /// Rejected because the queue was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Given up on after exhausting retries.
    pub failed_events: Arc<AtomicU64>,
}

impl BufferedSink {
    /// Create a new sink and spawn the background task that batches records
    /// and sends them to `backend`.
    ///
    /// Must be called from within a Tokio runtime. The task ends once the
    /// sink is dropped and the remaining records are delivered.
    pub fn new(backend: Arc<dyn AsyncLogSink>, config: BufferConfig) -> (Self, JoinHandle<()>) {
        let config = config.normalized();
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let pending = Arc::new(AtomicUsize::new(0));
        let failed_events = Arc::new(AtomicU64::new(0));

        let mut worker = Worker {
            backend,
            batch: Vec::with_capacity(config.batch_size),
            errors: Vec::new(),
            pending: Arc::clone(&pending),
            failed_events: Arc::clone(&failed_events),
            max_retries: config.max_retries,
        };
        let batch_size = config.batch_size;
        let flush_interval = config.flush_interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = rx.recv() => match command {
                        Some(Command::Record(record)) => {
                            worker.batch.push(record);
                            if worker.batch.len() >= batch_size {
                                worker.deliver().await;
                            }
                        }
                        Some(Command::Flush(ack)) => {
                            let result = worker.flush().await;
                            // The caller may have given up waiting.
                            let _ = ack.send(result);
                        }
                        None => {
                            if let Err(err) = worker.flush().await {
                                tracing::warn!(error = %err, "final log flush failed");
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !worker.batch.is_empty() {
                            worker.deliver().await;
                        }
                    }
                }
            }
        });

        (
            Self {
                sender: tx,
                capacity: config.channel_buffer,
                pending,
                total_events: Arc::new(AtomicU64::new(0)),
                enqueued_events: Arc::new(AtomicU64::new(0)),
                dropped_events: Arc::new(AtomicU64::new(0)),
                failed_events,
            },
            handle,
        )
    }
}

struct Worker {
    backend: Arc<dyn AsyncLogSink>,
    batch: Vec<Record>,
    /// Delivery failures since the last flush.
    errors: Vec<SinkError>,
    pending: Arc<AtomicUsize>,
    failed_events: Arc<AtomicU64>,
    max_retries: u32,
}

impl Worker {
    /// Send the current batch in order, retrying each record with backoff.
    async fn deliver(&mut self) {
        let max_backoff = Duration::from_secs(10);
        for record in self.batch.drain(..) {
            let mut backoff = Duration::from_millis(100);
            let mut attempt = 0;
            loop {
                match self.backend.send(&record).await {
                    Ok(()) => break,
                    Err(err) if attempt < self.max_retries => {
                        attempt += 1;
                        tracing::debug!(error = %err, ?backoff, attempt, "log backend send failed, retrying");
                        sleep(backoff).await;
                        backoff = std::cmp::min(backoff * 2, max_backoff);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "log backend send failed, giving up on record");
                        self.failed_events.fetch_add(1, Ordering::Relaxed);
                        self.errors.push(SinkError::Backend(err.to_string()));
                        break;
                    }
                }
            }
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.deliver().await;
        if let Err(err) = self.backend.flush().await {
            self.errors.push(SinkError::Backend(err.to_string()));
        }
        SinkError::collect(std::mem::take(&mut self.errors))
    }
}

impl LogSink for BufferedSink {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.pending.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(capacity = self.capacity, "log queue full, rejecting record");
            return Err(SinkError::QueueFull);
        }
        if self.sender.send(Command::Record(record.clone())).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(SinkError::Closed);
        }
        self.enqueued_events.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn sync(&self) -> Result<(), SinkError> {
        let (ack, done) = std_mpsc::channel();
        self.sender
            .send(Command::Flush(ack))
            .map_err(|_| SinkError::Closed)?;
        done.recv().map_err(|_| SinkError::Closed)?
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::record::Level;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<String>>,
        flushes: AtomicUsize,
    }

    #[async_trait]
    impl AsyncLogSink for Collect {
        async fn send(&self, record: &Record) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push(record.message().to_string());
            Ok(())
        }

        async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn record(msg: &str) -> Record {
        Record::new(Utc::now(), Level::Info, msg, None, Vec::new())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sync_delivers_in_order() {
        let backend = Arc::new(Collect::default());
        let config = BufferConfig {
            batch_size: 1000,
            flush_interval: Duration::from_secs(60),
            ..BufferConfig::default()
        };
        let (sink, _handle) = BufferedSink::new(backend.clone(), config);
        let sink = Arc::new(sink);

        for i in 0..50 {
            sink.write(&record(&format!("m{i}"))).unwrap();
        }
        let syncing = Arc::clone(&sink);
        tokio::task::spawn_blocking(move || syncing.sync())
            .await
            .unwrap()
            .unwrap();

        let seen = backend.seen.lock().unwrap().clone();
        let expected: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
        assert_eq!(seen, expected);
        assert_eq!(backend.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(sink.enqueued_events.load(Ordering::Relaxed), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_sink_drains_queue() {
        let backend = Arc::new(Collect::default());
        let (sink, handle) = BufferedSink::new(backend.clone(), BufferConfig::default());
        sink.write(&record("last words")).unwrap();
        drop(sink);
        handle.await.unwrap();

        assert_eq!(*backend.seen.lock().unwrap(), ["last words"]);
    }
}
