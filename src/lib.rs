//! # ctxlog
//!
//! Structured logging with typed fields that can come from three places: the
//! log call itself, the [`Logger`] (via [`Logger::with`]) and the request
//! [`Context`] (via [`with`]). Each call assembles one immutable [`Record`]
//! and hands it to every attached [`LogSink`], which renders it for humans
//! ([`human`]) or machines ([`json`]).
//!
//! ```no_run
//! use ctxlog::{component, f, human::HumanSink, Context, HumanConfig, Logger};
//!
//! let logger = Logger::make(HumanSink::stderr(HumanConfig::default()));
//! let ctx = ctxlog::with(&Context::background(), [f("request_id", "r-17"), component("api")]);
//! logger.info(&ctx, "request served", [f("status", 200)]);
//! ```

pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod error_chain;
pub mod field;
pub mod human;
pub mod json;
pub mod logger;
pub mod memory_sink;
pub mod noop_sink;
pub mod record;
pub mod resolved;
pub mod sink;
pub mod value;

#[cfg(feature = "buffered")]
pub mod buffered;

pub use config::{BufferConfig, ColorMode, HumanConfig};
pub use context::{with, Context};
pub use error::{ConfigError, SinkError};
pub use field::{component, error, error_arc, f, lazy, map, Field, FieldSet};
pub use logger::{Logger, ProcessExit, Terminator};
pub use record::{CallerLocation, Level, Record};
pub use sink::LogSink;
pub use value::{LogValue, Value};

#[cfg(feature = "buffered")]
pub use sink::AsyncLogSink;
