use std::fmt;

/// Error type returned by [`LogSink`](crate::sink::LogSink) writes and syncs.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("log queue full, record rejected")]
    QueueFull,

    #[error("log sink is closed")]
    Closed,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("{}", DisplayAll(.0))]
    Multiple(Vec<SinkError>),
}

impl SinkError {
    /// Fold a list of sink errors into at most one error.
    pub(crate) fn collect(mut errors: Vec<SinkError>) -> Result<(), SinkError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SinkError::Multiple(errors)),
        }
    }
}

struct DisplayAll<'a>(&'a [SinkError]);

impl fmt::Display for DisplayAll<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sinks failed", self.0.len())?;
        for err in self.0 {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

/// Error type returned when parsing configuration values.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid color mode {0:?}, expected auto, always or never")]
    InvalidColorMode(String),

    #[error("invalid number for {key}: {value:?}")]
    InvalidNumber { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_folds_errors() {
        assert!(SinkError::collect(Vec::new()).is_ok());
        assert!(matches!(
            SinkError::collect(vec![SinkError::Closed]),
            Err(SinkError::Closed)
        ));

        let err = SinkError::collect(vec![SinkError::Closed, SinkError::QueueFull]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "2 sinks failed; log sink is closed; log queue full, record rejected"
        );
    }
}
