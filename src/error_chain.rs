//! Error chains with per-link source locations.
//!
//! Any `std::error::Error` can be logged; its `source()` chain is walked at
//! render time. Links created through [`wrap`] or [`located`] additionally
//! carry the location they were created at.

use std::error::Error;
use std::fmt;
use std::panic::Location;

use serde::Serialize;

use crate::resolved::MAX_DEPTH;

/// One level of an unwrapped error chain. Chains are ordered outermost first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    pub msg: String,
    #[serde(rename = "loc", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.msg),
            None => f.write_str(&self.msg),
        }
    }
}

/// An error annotated with the location it was created at.
pub struct LocatedError {
    msg: String,
    location: &'static Location<'static>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl LocatedError {
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl fmt::Debug for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatedError")
            .field("msg", &self.msg)
            .field("location", &format_args!("{}:{}", self.location.file(), self.location.line()))
            .field("source", &self.source)
            .finish()
    }
}

impl Error for LocatedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Wrap `err` with a message, recording the caller's location.
#[track_caller]
pub fn wrap<E>(err: E, msg: impl Into<String>) -> LocatedError
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    LocatedError {
        msg: msg.into(),
        location: Location::caller(),
        source: Some(err.into()),
    }
}

/// Create a root error recording the caller's location.
#[track_caller]
pub fn located(msg: impl Into<String>) -> LocatedError {
    LocatedError {
        msg: msg.into(),
        location: Location::caller(),
        source: None,
    }
}

/// Unwrap `err` into its links, outermost first.
///
/// A link whose message ends with `": <next link>"` has that suffix removed so
/// each level only shows its own contribution.
pub fn links(err: &(dyn Error + 'static)) -> Vec<ChainLink> {
    let mut out = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        if out.len() >= MAX_DEPTH {
            out.push(ChainLink {
                msg: "<max depth>".to_string(),
                location: None,
            });
            break;
        }
        let next = e.source();
        let mut msg = e.to_string();
        if let Some(next) = next {
            let suffix = format!(": {next}");
            if msg.len() > suffix.len() && msg.ends_with(&suffix) {
                msg.truncate(msg.len() - suffix.len());
            }
        }
        let location = e
            .downcast_ref::<LocatedError>()
            .map(|l| format!("{}:{}", l.location.file(), l.location.line()));
        out.push(ChainLink { msg, location });
        current = next;
    }
    out
}
