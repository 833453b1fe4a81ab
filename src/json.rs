//! Machine readable rendering, one JSON object per line.
//!
//! ```json
//! {"ts":"2024-05-01T12:00:00.000Z","level":"INFO","component":"api.auth","msg":"login","caller":"src/main.rs:10","fields":{"user":42}}
//! ```
//!
//! `component`, `caller` and `fields` are omitted when empty. Error values
//! are arrays of `{"msg", "loc"}` objects, outermost first. For a repeated
//! field name only the last value is kept.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use chrono::SecondsFormat;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::SinkError;
use crate::record::{Level, Record, ResolvedField};
use crate::sink::LogSink;

#[derive(Serialize)]
struct JsonEntry<'a> {
    ts: String,
    level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a str>,
    msg: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<String>,
    #[serde(skip_serializing_if = "Fields::is_empty")]
    fields: Fields<'a>,
}

struct Fields<'a>(Vec<&'a ResolvedField>);

impl Fields<'_> {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Fields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in &self.0 {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

/// Render `record` as a single newline-terminated JSON line.
pub fn render(record: &Record) -> Result<Vec<u8>, serde_json::Error> {
    let entry = JsonEntry {
        ts: record.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
        level: record.level(),
        component: record.component(),
        msg: record.message(),
        caller: record.location().map(|l| l.to_string()),
        fields: Fields(record.visible_fields()),
    };
    let mut bytes = serde_json::to_vec(&entry)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes JSON lines to any [`Write`] destination.
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LogSink for JsonSink<W> {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let bytes = render(record)?;
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

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::error_chain::located;
    use crate::field::{component, error, f, map};
    use crate::record::CallerLocation;

    fn parse(record: &Record) -> serde_json::Value {
        serde_json::from_slice(&render(record).unwrap()).unwrap()
    }

    #[test]
    fn full_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = Record::new(
            ts,
            Level::Warn,
            "slow\nrequest",
            Some(CallerLocation { file: "src/api.rs", line: 9 }),
            vec![
                component("api"),
                f("ms", 1500),
                map("req", [f("path", "/"), f("ok", false)]),
                f("ms", 1600),
            ],
        );

        let bytes = render(&record).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(
            parse(&record),
            json!({
                "ts": "2024-05-01T12:00:00.000Z",
                "level": "WARN",
                "component": "api",
                "msg": "slow\nrequest",
                "caller": "src/api.rs:9",
                "fields": {"req": {"path": "/", "ok": false}, "ms": 1600},
            })
        );
    }

    #[test]
    fn error_is_array_of_links() {
        let record = Record::new(Utc::now(), Level::Error, "m", None, vec![error(located("boom"))]);
        let line = line!() - 1;
        let value = parse(&record);
        assert_eq!(
            value["fields"]["error"],
            json!([{"msg": "boom", "loc": format!("{}:{}", file!(), line)}])
        );
        assert!(value.get("caller").is_none());
        assert!(value.get("component").is_none());
    }

    #[test]
    fn empty_fields_are_omitted() {
        let record = Record::new(Utc::now(), Level::Info, "m", None, Vec::new());
        assert!(parse(&record).get("fields").is_none());
    }

    #[test]
    fn key_order_is_stable() {
        let record = Record::new(Utc::now(), Level::Info, "m", None, vec![f("b", 1), f("a", 2)]);
        let text = String::from_utf8(render(&record).unwrap()).unwrap();
        let ts = text.find("\"ts\"").unwrap();
        let level = text.find("\"level\"").unwrap();
        let msg = text.find("\"msg\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        assert!(ts < level && level < msg && msg < b && b < a);
    }
}
