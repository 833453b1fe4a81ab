//! Human readable rendering.
//!
//! A record renders as one header line followed by zero or more indented
//! blocks:
//!
//! ```text
//! 2024-05-01 12:00:00.000 [INFO]	(api.auth)	<src/main.rs:10>	login	{"user": 42}
//!   "error": src/auth.rs:31: checking password
//!   database unavailable
//! ```
//!
//! Fields whose rendering spans several lines (strings with line breaks,
//! error chains, large objects) are moved out of the inline `{...}` blob into
//! blocks, in field order. A multiline message is replaced by `...` in the
//! header and emitted as a `"msg"` block before the field blocks.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::config::HumanConfig;
use crate::error::SinkError;
use crate::record::{Level, Record};
use crate::resolved::Resolved;
use crate::sink::LogSink;

/// Timestamp format of the header line, always in UTC.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Margin applied to every non-empty line of a block.
pub const BLOCK_INDENT: &str = "  ";

/// Objects and lists whose inline form is wider than this render as blocks.
pub const INLINE_WIDTH: usize = 80;

/// Render `record` to bytes. With `color` off the output contains no escape
/// codes; with it on, the same text is decorated with ANSI styling.
pub fn render(record: &Record, color: bool) -> Vec<u8> {
    let mut buf = if color { Buffer::ansi() } else { Buffer::no_color() };
    // Writing into an in-memory buffer cannot fail.
    let _ = write_record(record, &mut buf);
    buf.into_inner()
}

/// Render `record` into any color-aware writer.
pub fn write_record<W: WriteColor>(record: &Record, out: &mut W) -> io::Result<()> {
    write!(out, "{} ", record.timestamp().format(TIME_FORMAT))?;

    out.set_color(ColorSpec::new().set_fg(Some(level_color(record.level()))).set_bold(true))?;
    write!(out, "[{}]", record.level())?;
    out.reset()?;
    write!(out, "\t")?;

    if let Some(component) = record.component() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "({component})")?;
        out.reset()?;
        write!(out, "\t")?;
    }

    if let Some(location) = record.location() {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(out, "<{location}>")?;
        out.reset()?;
        write!(out, "\t")?;
    }

    let mut blocks: Vec<(&str, String)> = Vec::new();
    let message = record.message();
    if message.contains('\n') {
        write!(out, "...")?;
        blocks.push(("msg", message.to_string()));
    } else {
        write!(out, "{message}")?;
    }

    let mut inline = Vec::new();
    for field in record.visible_fields() {
        match multiline_text(&field.value) {
            Some(text) => blocks.push((field.name.as_str(), text)),
            None => inline.push((field.name.as_str(), &field.value)),
        }
    }
    if !inline.is_empty() {
        let mut blob = String::from("{");
        for (i, (name, value)) in inline.into_iter().enumerate() {
            if i > 0 {
                blob.push_str(", ");
            }
            push_quoted(&mut blob, name);
            blob.push_str(": ");
            push_inline(&mut blob, value);
        }
        blob.push('}');
        write!(out, "\t{blob}")?;
    }
    writeln!(out)?;

    for (name, text) in blocks {
        write_block(out, name, &text)?;
    }
    Ok(())
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error | Level::Critical | Level::Fatal => Color::Red,
    }
}

fn write_block<W: WriteColor>(out: &mut W, name: &str, text: &str) -> io::Result<()> {
    let mut key = String::new();
    push_quoted(&mut key, name);

    write!(out, "{BLOCK_INDENT}")?;
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{key}:")?;
    out.reset()?;

    let mut lines = text.split('\n');
    match lines.next() {
        Some(first) if !first.is_empty() => writeln!(out, " {first}")?,
        _ => writeln!(out)?,
    }
    for line in lines {
        if line.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "{BLOCK_INDENT}{line}")?;
        }
    }
    Ok(())
}

/// The block text for values that do not fit on the header line.
fn multiline_text(value: &Resolved) -> Option<String> {
    match value {
        Resolved::Str(s) if s.contains('\n') => Some(s.clone()),
        Resolved::Chain(links) => Some(
            links
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Resolved::Map(_) | Resolved::List(_) => {
            let mut inline = String::new();
            push_inline(&mut inline, value);
            (inline.len() > INLINE_WIDTH)
                .then(|| serde_json::to_string_pretty(value).unwrap_or(inline))
        }
        _ => None,
    }
}

fn push_quoted(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str(s),
    }
}

/// JSON-like single-line form with `": "` and `", "` separators.
fn push_inline(out: &mut String, value: &Resolved) {
    match value {
        Resolved::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_quoted(out, k);
                out.push_str(": ");
                push_inline(out, v);
            }
            out.push('}');
        }
        Resolved::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_inline(out, item);
            }
            out.push(']');
        }
        Resolved::Chain(links) => {
            out.push('[');
            for (i, link) in links.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str("{\"msg\": ");
                push_quoted(out, &link.msg);
                if let Some(location) = &link.location {
                    out.push_str(", \"loc\": ");
                    push_quoted(out, location);
                }
                out.push('}');
            }
            out.push(']');
        }
        scalar => match serde_json::to_string(scalar) {
            Ok(text) => out.push_str(&text),
            Err(_) => out.push_str("null"),
        },
    }
}

/// Writes human readable records to any [`Write`] destination.
pub struct HumanSink<W> {
    out: Mutex<W>,
    color: bool,
}

impl<W: Write + Send> HumanSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HumanSink<io::Stderr> {
    /// Human output on stderr, colored when stderr is a terminal and the
    /// config allows it.
    pub fn stderr(config: HumanConfig) -> Self {
        use std::io::IsTerminal;
        let color = config.color.enabled(io::stderr().is_terminal());
        Self::new(io::stderr(), color)
    }
}

impl HumanSink<io::Stdout> {
    pub fn stdout(config: HumanConfig) -> Self {
        use std::io::IsTerminal;
        let color = config.color.enabled(io::stdout().is_terminal());
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> LogSink for HumanSink<W> {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let bytes = render(record, self.color);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(&bytes)?;
        Ok(())
    }

    fn sync(&self) -> Result<(), SinkError> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}
