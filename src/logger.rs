//! The leveled logging API.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::context::Context;
use crate::error::SinkError;
use crate::field::{Field, FieldSet};
use crate::record::{CallerLocation, Level, Record};
use crate::sink::LogSink;

/// Called after a fatal record has been written and every sink synced.
pub trait Terminator: Send + Sync {
    fn terminate(&self, record: &Record);
}

/// Exits the process with status 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, _record: &Record) {
        std::process::exit(1);
    }
}

/// A handle that assembles records and hands them to its sinks.
///
/// Cloning and [`Logger::with`] are cheap and never affect the original, so a
/// base logger can be shared across threads and specialized per call tree.
#[derive(Clone)]
pub struct Logger {
    fields: FieldSet,
    sinks: Arc<[Arc<dyn LogSink>]>,
    terminator: Arc<dyn Terminator>,
}

impl Logger {
    /// Create a logger writing to `sinks`, in the given order.
    pub fn new(sinks: impl IntoIterator<Item = Arc<dyn LogSink>>) -> Self {
        Logger {
            fields: FieldSet::new(),
            sinks: sinks.into_iter().collect(),
            terminator: Arc::new(ProcessExit),
        }
    }

    /// Create a logger writing to a single sink.
    pub fn make(sink: impl LogSink + 'static) -> Self {
        Logger::new([Arc::new(sink) as Arc<dyn LogSink>])
    }

    /// A logger without sinks. Every call still assembles a record.
    pub fn discard() -> Self {
        Logger::new(Vec::new())
    }

    /// Replace what happens after a fatal record has been flushed.
    pub fn with_terminator(mut self, terminator: impl Terminator + 'static) -> Self {
        self.terminator = Arc::new(terminator);
        self
    }

    /// Returns a logger sharing the same sinks whose records also carry
    /// `fields`, after any context fields and before call-site fields.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        Logger {
            fields: self.fields.with(fields),
            sinks: Arc::clone(&self.sinks),
            terminator: Arc::clone(&self.terminator),
        }
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    #[track_caller]
    pub fn debug(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Debug, Some(Location::caller().into()), msg, fields);
    }

    #[track_caller]
    pub fn info(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Info, Some(Location::caller().into()), msg, fields);
    }

    #[track_caller]
    pub fn warn(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Warn, Some(Location::caller().into()), msg, fields);
    }

    #[track_caller]
    pub fn error(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Error, Some(Location::caller().into()), msg, fields);
    }

    #[track_caller]
    pub fn critical(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Critical, Some(Location::caller().into()), msg, fields);
    }

    /// Log at [`Level::Fatal`], sync every sink, then call the terminator.
    #[track_caller]
    pub fn fatal(&self, ctx: &Context, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, Level::Fatal, Some(Location::caller().into()), msg, fields);
    }

    /// Log at `level`, attributed to the caller.
    ///
    /// Helpers that wrap the logger should be `#[track_caller]` themselves so
    /// records point at their callers instead.
    #[track_caller]
    pub fn log(&self, ctx: &Context, level: Level, msg: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        self.log_at(ctx, level, Some(Location::caller().into()), msg, fields);
    }

    /// Log with an explicit location, for callers that resolve it themselves.
    pub fn log_at(
        &self,
        ctx: &Context,
        level: Level,
        location: Option<CallerLocation>,
        msg: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) {
        let call_site: Vec<Field> = fields.into_iter().collect();
        let record = Record::assemble(level, msg, location, ctx.fields(), &self.fields, &call_site);
        self.emit(&record);

        if level == Level::Fatal {
            if let Err(err) = self.sync() {
                tracing::warn!(error = %err, "failed to sync log sinks before exit");
            }
            self.terminator.terminate(&record);
        }
    }

    fn emit(&self, record: &Record) {
        for (index, sink) in self.sinks.iter().enumerate() {
            if let Err(err) = sink.write(record) {
                tracing::warn!(sink = index, error = %err, "log sink write failed");
            }
        }
    }

    /// Sync every sink, in attachment order.
    ///
    /// All sinks are synced even if some fail; the failures are returned
    /// together.
    pub fn sync(&self) -> Result<(), SinkError> {
        let errors: Vec<SinkError> = self
            .sinks
            .iter()
            .filter_map(|sink| sink.sync().err())
            .collect();
        SinkError::collect(errors)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("fields", &self.fields)
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::field::f;
    use crate::memory_sink::MemorySink;

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write(&self, _record: &Record) -> Result<(), SinkError> {
            Err(SinkError::Backend("down".into()))
        }

        fn sync(&self) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[derive(Default)]
    struct RecordingTerminator(Mutex<Vec<String>>);

    impl Terminator for Arc<RecordingTerminator> {
        fn terminate(&self, record: &Record) {
            self.0.lock().unwrap().push(record.message().to_string());
        }
    }

    #[test]
    fn caller_location_points_at_call_site() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new([sink.clone() as Arc<dyn LogSink>]);
        logger.info(&Context::background(), "here", []);
        let line = line!() - 1;

        let records = sink.records();
        assert_eq!(records[0].location(), Some(CallerLocation { file: file!(), line }));
    }

    #[track_caller]
    fn helper(logger: &Logger) {
        logger.warn(&Context::background(), "from helper", []);
    }

    #[test]
    fn track_caller_helpers_are_skipped() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new([sink.clone() as Arc<dyn LogSink>]);
        helper(&logger);
        let line = line!() - 1;

        assert_eq!(sink.records()[0].location().map(|l| l.line), Some(line));
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new([
            Arc::new(FailingSink) as Arc<dyn LogSink>,
            sink.clone() as Arc<dyn LogSink>,
        ]);
        logger.error(&Context::background(), "still delivered", [f("k", 1)]);

        assert_eq!(sink.len(), 1);
        assert!(matches!(logger.sync(), Err(SinkError::Closed)));
        assert_eq!(sink.sync_count(), 1);
    }

    #[test]
    fn fatal_syncs_then_terminates() {
        let sink = Arc::new(MemorySink::new());
        let terminator = Arc::new(RecordingTerminator::default());
        let logger = Logger::new([
            sink.clone() as Arc<dyn LogSink>,
            Arc::new(FailingSink) as Arc<dyn LogSink>,
        ])
        .with_terminator(Arc::clone(&terminator));

        logger.fatal(&Context::background(), "giving up", []);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].level(), Level::Fatal);
        assert_eq!(sink.sync_count(), 1);
        assert_eq!(*terminator.0.lock().unwrap(), ["giving up"]);
    }

    #[test]
    fn discard_logger_accepts_calls() {
        let logger = Logger::discard().with([f("x", 1)]);
        logger.debug(&Context::background(), "nobody listens", []);
        assert!(logger.sync().is_ok());
    }
}
