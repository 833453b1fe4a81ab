//! Loggable values.
//!
//! A [`Value`] is what a field carries from the call site to the sink. Nothing
//! expensive happens when a value is built: lazy thunks, self-rendering
//! objects, error chains and reflected `Serialize` values are only evaluated
//! when a record is rendered, see [`crate::resolved`].

use std::any::TypeId;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::field::Field;

/// A type that knows how to render itself as a [`Value`].
///
/// Implement this for domain types that should appear as structured objects
/// in log output. The method is called at render time, never at the call site.
pub trait LogValue: Send + Sync {
    fn log_value(&self) -> Value;
}

type Thunk = dyn Fn() -> Value + Send + Sync;
type ToJson = dyn Fn() -> Result<serde_json::Value, serde_json::Error> + Send + Sync;

/// A value evaluated once per record, when the record is first rendered.
#[derive(Clone)]
pub struct Lazy(Arc<Thunk>);

impl Lazy {
    pub fn new<F, V>(thunk: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Lazy(Arc::new(move || thunk().into()))
    }

    pub(crate) fn call(&self) -> Value {
        (self.0)()
    }

    /// Identity of the underlying thunk; clones share it.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

/// A `Serialize` value captured for the reflective fallback path.
#[derive(Clone)]
pub struct Reflected {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    to_json: Arc<ToJson>,
}

impl Reflected {
    pub(crate) fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        (self.to_json)()
    }
}

/// A loggable field value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Nested named mapping, rendered in field order.
    Map(Vec<Field>),
    /// Error whose `source()` chain is unwrapped at render time.
    Error(Arc<dyn Error + Send + Sync + 'static>),
    /// One segment of a dotted component path.
    Component(String),
    Lazy(Lazy),
    Object(Arc<dyn LogValue>),
    Reflected(Reflected),
}

impl Value {
    /// Wrap a self-rendering object.
    pub fn object<T: LogValue + 'static>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    /// Capture any `Serialize` value through the reflective fallback path.
    ///
    /// All serialized fields are surfaced, private ones included. Renames and
    /// skips registered with [`register_overrides`] for `T` are applied at
    /// render time.
    pub fn reflect<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Value::Reflected(Reflected {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            to_json: Arc::new(move || serde_json::to_value(&value)),
        })
    }

    pub fn lazy<F, V>(thunk: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Value::Lazy(Lazy::new(thunk))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Value::Component(v) => f.debug_tuple("Component").field(v).finish(),
            Value::Lazy(_) => f.write_str("Lazy(..)"),
            Value::Object(_) => f.write_str("Object(..)"),
            Value::Reflected(r) => write!(f, "Reflected({})", r.type_name),
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Uint(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<std::time::Duration> for Value {
    fn from(v: std::time::Duration) -> Self {
        Value::Str(format!("{v:?}"))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Str(v.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: LogValue + 'static> From<Arc<T>> for Value {
    fn from(v: Arc<T>) -> Self {
        Value::Object(v)
    }
}

impl From<Lazy> for Value {
    fn from(v: Lazy) -> Self {
        Value::Lazy(v)
    }
}

/// Per-type field renames and skips for the reflective fallback path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldOverrides {
    renames: Vec<(String, String)>,
    skips: Vec<String>,
}

impl FieldOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, field: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.push((field.into(), to.into()));
        self
    }

    pub fn skip(mut self, field: impl Into<String>) -> Self {
        self.skips.push(field.into());
        self
    }

    /// Returns the output name for `field`, or `None` when it is skipped.
    pub(crate) fn apply<'a>(&'a self, field: &'a str) -> Option<&'a str> {
        if self.skips.iter().any(|s| s == field) {
            return None;
        }
        let renamed = self
            .renames
            .iter()
            .find(|(from, _)| from == field)
            .map(|(_, to)| to.as_str());
        Some(renamed.unwrap_or(field))
    }
}

static OVERRIDES: OnceLock<RwLock<HashMap<TypeId, FieldOverrides>>> = OnceLock::new();

fn overrides() -> &'static RwLock<HashMap<TypeId, FieldOverrides>> {
    OVERRIDES.get_or_init(Default::default)
}

/// Register field overrides consulted when values of type `T` are rendered
/// through [`Value::reflect`]. A later registration replaces an earlier one.
pub fn register_overrides<T: 'static>(overrides_for_t: FieldOverrides) {
    overrides()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(TypeId::of::<T>(), overrides_for_t);
}

pub(crate) fn overrides_for(type_id: TypeId) -> Option<FieldOverrides> {
    overrides()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .cloned()
}
