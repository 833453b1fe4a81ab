use crate::error::SinkError;
use crate::record::Record;
use crate::sink::LogSink;

/// A sink that simply drops all records.
///
/// Useful for measuring the cost of record assembly without any I/O, and
/// for tests that don't care about output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write(&self, _record: &Record) -> Result<(), SinkError> {
        Ok(())
    }
}
