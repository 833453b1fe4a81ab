//! The render-ready form of a [`Value`].
//!
//! A [`Resolved`] tree contains only scalars, strings, lists, ordered named
//! mappings and error chains. Both renderers consume it directly.

use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error_chain::{self, ChainLink};
use crate::value::{self, Lazy, Reflected, Value};

/// Nesting deeper than this renders as a `<max depth>` marker.
pub const MAX_DEPTH: usize = 64;

pub const CYCLE_MARKER: &str = "<cycle>";
pub const MAX_DEPTH_MARKER: &str = "<max depth>";

#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    List(Vec<Resolved>),
    Map(Vec<(String, Resolved)>),
    Chain(Vec<ChainLink>),
}

impl Resolved {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::Str(s) => Some(s),
            _ => None,
        }
    }

    fn marker(text: &str) -> Self {
        Resolved::Str(text.to_string())
    }

    fn from_json(json: serde_json::Value, overrides: Option<&value::FieldOverrides>) -> Self {
        match json {
            serde_json::Value::Null => Resolved::Null,
            serde_json::Value::Bool(b) => Resolved::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Resolved::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Resolved::Uint(u)
                } else {
                    Resolved::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Resolved::Str(s),
            serde_json::Value::Array(items) => {
                Resolved::List(items.into_iter().map(|v| Self::from_json(v, None)).collect())
            }
            serde_json::Value::Object(map) => Resolved::Map(
                map.into_iter()
                    .filter_map(|(key, v)| {
                        let name = match overrides {
                            Some(o) => o.apply(&key)?.to_string(),
                            None => key,
                        };
                        Some((name, Self::from_json(v, None)))
                    })
                    .collect(),
            ),
        }
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolved::Null => serializer.serialize_unit(),
            Resolved::Bool(b) => serializer.serialize_bool(*b),
            Resolved::Int(i) => serializer.serialize_i64(*i),
            Resolved::Uint(u) => serializer.serialize_u64(*u),
            Resolved::Float(f) if f.is_nan() => serializer.serialize_str("NaN"),
            Resolved::Float(f) if f.is_infinite() => {
                serializer.serialize_str(if *f > 0.0 { "+Inf" } else { "-Inf" })
            }
            Resolved::Float(f) => serializer.serialize_f64(*f),
            Resolved::Str(s) => serializer.serialize_str(s),
            Resolved::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Resolved::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Resolved::Chain(links) => links.serialize(serializer),
        }
    }
}

/// Turns [`Value`]s into [`Resolved`] trees for a single record.
///
/// Lazy thunks are cached by identity, so a thunk shared by several fields of
/// the same record runs once. The cache holds on to every thunk it has seen so
/// an address cannot be reused by a later thunk while the resolver is alive.
/// Objects and thunks currently being resolved are tracked to cut cycles.
#[derive(Default)]
pub(crate) struct Resolver {
    lazies: HashMap<usize, (Lazy, Resolved)>,
    in_progress: Vec<usize>,
}

impl Resolver {
    pub(crate) fn resolve(&mut self, value: &Value) -> Resolved {
        self.resolve_at(value, 0)
    }

    fn resolve_at(&mut self, value: &Value, depth: usize) -> Resolved {
        if depth > MAX_DEPTH {
            return Resolved::marker(MAX_DEPTH_MARKER);
        }
        match value {
            Value::Null => Resolved::Null,
            Value::Bool(b) => Resolved::Bool(*b),
            Value::Int(i) => Resolved::Int(*i),
            Value::Uint(u) => Resolved::Uint(*u),
            Value::Float(f) => Resolved::Float(*f),
            Value::Str(s) | Value::Component(s) => Resolved::Str(s.clone()),
            Value::List(items) => Resolved::List(
                items
                    .iter()
                    .map(|item| self.resolve_at(item, depth + 1))
                    .collect(),
            ),
            Value::Map(fields) => Resolved::Map(
                fields
                    .iter()
                    .map(|f| (f.name().to_string(), self.resolve_at(f.value(), depth + 1)))
                    .collect(),
            ),
            Value::Error(err) => Resolved::Chain(error_chain::links(err.as_ref())),
            Value::Lazy(lazy) => {
                let key = lazy.key();
                if let Some((_, done)) = self.lazies.get(&key) {
                    return done.clone();
                }
                let resolved = self.guarded(key, depth, |r, depth| {
                    let produced = lazy.call();
                    r.resolve_at(&produced, depth + 1)
                });
                self.lazies.insert(key, (lazy.clone(), resolved.clone()));
                resolved
            }
            Value::Object(object) => {
                let key = std::sync::Arc::as_ptr(object) as *const () as usize;
                self.guarded(key, depth, |r, depth| {
                    let produced = object.log_value();
                    r.resolve_at(&produced, depth + 1)
                })
            }
            Value::Reflected(reflected) => resolve_reflected(reflected),
        }
    }

    fn guarded(
        &mut self,
        key: usize,
        depth: usize,
        resolve: impl FnOnce(&mut Self, usize) -> Resolved,
    ) -> Resolved {
        if self.in_progress.contains(&key) {
            return Resolved::marker(CYCLE_MARKER);
        }
        self.in_progress.push(key);
        let resolved = resolve(self, depth);
        self.in_progress.pop();
        resolved
    }
}

fn resolve_reflected(reflected: &Reflected) -> Resolved {
    match reflected.to_json() {
        Ok(json) => {
            let overrides = value::overrides_for(reflected.type_id);
            Resolved::from_json(json, overrides.as_ref())
        }
        Err(err) => {
            tracing::debug!(type_name = reflected.type_name, error = %err, "value could not be reflected");
            Resolved::Str(format!("<unsupported: {}>", reflected.type_name))
        }
    }
}
