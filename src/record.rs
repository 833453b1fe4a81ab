use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::field::{self, Field, FieldSet, COMPONENT_KEY};
use crate::resolved::{Resolved, Resolver};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location a record is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerLocation {
    pub file: &'static str,
    pub line: u32,
}

impl From<&'static Location<'static>> for CallerLocation {
    fn from(location: &'static Location<'static>) -> Self {
        CallerLocation {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for CallerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A field after its value has been resolved for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub value: Resolved,
}

#[derive(Debug)]
struct Inner {
    timestamp: DateTime<Utc>,
    level: Level,
    message: String,
    location: Option<CallerLocation>,
    fields: Vec<Field>,
    resolved: OnceLock<Vec<ResolvedField>>,
}

/// One fully assembled log event.
///
/// Records are immutable. Clones share the same data, including the cache of
/// resolved field values, so lazy values run at most once per record no
/// matter how many sinks render it.
#[derive(Debug, Clone)]
pub struct Record(Arc<Inner>);

impl Record {
    /// Build a record from fields in their final order. Component tags are
    /// joined into one path, see [`field::merge`].
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        message: impl Into<String>,
        location: Option<CallerLocation>,
        fields: Vec<Field>,
    ) -> Self {
        Record(Arc::new(Inner {
            timestamp,
            level,
            message: message.into(),
            location,
            fields: field::merge(&fields),
            resolved: OnceLock::new(),
        }))
    }

    /// Assemble a record from its three field sources.
    ///
    /// Fields are concatenated as context, then logger-bound, then call-site,
    /// with component tags joined into one path. Nothing is deduplicated.
    pub fn assemble(
        level: Level,
        message: impl Into<String>,
        location: Option<CallerLocation>,
        context: &FieldSet,
        bound: &FieldSet,
        call_site: &[Field],
    ) -> Self {
        let fields = context.iter().chain(bound.iter()).chain(call_site).cloned().collect();
        Record::new(Utc::now(), level, message, location, fields)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0.timestamp
    }

    pub fn level(&self) -> Level {
        self.0.level
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }

    pub fn location(&self) -> Option<CallerLocation> {
        self.0.location
    }

    pub fn fields(&self) -> &[Field] {
        &self.0.fields
    }

    /// Resolved field values, computed on first use and cached for the
    /// lifetime of the record.
    pub fn resolved(&self) -> &[ResolvedField] {
        self.0.resolved.get_or_init(|| {
            let mut resolver = Resolver::default();
            self.0
                .fields
                .iter()
                .map(|f| ResolvedField {
                    name: f.name().to_string(),
                    value: resolver.resolve(f.value()),
                })
                .collect()
        })
    }

    /// The merged component path, if any layer tagged one.
    pub fn component(&self) -> Option<&str> {
        self.0
            .fields
            .iter()
            .find_map(Field::component_path)
    }

    /// Resolved fields as renderers display them: the component path is left
    /// out, and for a repeated name only its last occurrence is kept, in the
    /// position of that occurrence.
    pub fn visible_fields(&self) -> Vec<&ResolvedField> {
        let resolved = self.resolved();
        resolved
            .iter()
            .enumerate()
            .filter(|(i, rf)| {
                !(rf.name == COMPONENT_KEY && self.0.fields[*i].component_path().is_some())
                    && !resolved[i + 1..].iter().any(|later| later.name == rf.name)
            })
            .map(|(_, rf)| rf)
            .collect()
    }
}
