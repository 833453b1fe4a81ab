//! Fields and field sets.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::value::{Lazy, Value};

/// Reserved field name for [`error`] fields.
pub const ERROR_KEY: &str = "error";

/// Reserved field name for the merged [`component`] path.
pub const COMPONENT_KEY: &str = "component";

/// A named value attached to a log record.
#[derive(Clone, Debug)]
pub struct Field {
    name: Cow<'static, str>,
    value: Value,
}

impl Field {
    pub fn new(name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Field {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The component segment carried by this field, if it is a component tag.
    pub fn component_path(&self) -> Option<&str> {
        match &self.value {
            Value::Component(path) => Some(path),
            _ => None,
        }
    }
}

/// Build a field from any supported value.
pub fn f(name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Field {
    Field::new(name, value)
}

/// Build a field whose value is a nested mapping of `fields`.
pub fn map(name: impl Into<Cow<'static, str>>, fields: impl IntoIterator<Item = Field>) -> Field {
    Field::new(name, Value::Map(fields.into_iter().collect()))
}

/// Bind `err` to the reserved `"error"` name. Its chain is unwrapped when the
/// record is rendered.
pub fn error<E>(err: E) -> Field
where
    E: Error + Send + Sync + 'static,
{
    Field::new(ERROR_KEY, Value::Error(Arc::new(err)))
}

/// Like [`error`], for errors that are already shared or boxed.
pub fn error_arc(err: Arc<dyn Error + Send + Sync + 'static>) -> Field {
    Field::new(ERROR_KEY, Value::Error(err))
}

/// Tag the current code region with a component name. Component tags from all
/// layers are joined with `.` when a record is assembled.
pub fn component(name: impl Into<String>) -> Field {
    Field::new(COMPONENT_KEY, Value::Component(name.into()))
}

/// A field whose value is computed by `thunk` when the record is rendered.
pub fn lazy<F, V>(name: impl Into<Cow<'static, str>>, thunk: F) -> Field
where
    F: Fn() -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Field::new(name, Lazy::new(thunk))
}

struct Layer {
    parent: Option<Arc<Layer>>,
    fields: Vec<Field>,
    len: usize,
}

impl Drop for Layer {
    // Unlink uniquely owned parents one at a time so dropping a long chain
    // does not recurse once per layer.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(layer) = parent {
            parent = match Arc::into_inner(layer) {
                Some(mut layer) => layer.parent.take(),
                None => None,
            };
        }
    }
}

/// An ordered, immutable collection of fields.
///
/// [`FieldSet::with`] returns a new set that shares the existing fields with
/// the original; existing sets are never modified, so they can be read from
/// any number of threads while others derive from them.
#[derive(Clone, Default)]
pub struct FieldSet {
    head: Option<Arc<Layer>>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        FieldSet::new().with(fields)
    }

    /// Returns a set with `fields` appended after the existing ones.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        let fields: Vec<Field> = fields.into_iter().collect();
        if fields.is_empty() {
            return self.clone();
        }
        let len = self.len() + fields.len();
        FieldSet {
            head: Some(Arc::new(Layer {
                parent: self.head.clone(),
                fields,
                len,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |layer| layer.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> + '_ {
        let mut layers = Vec::new();
        let mut current = self.head.as_deref();
        while let Some(layer) = current {
            layers.push(layer);
            current = layer.parent.as_deref();
        }
        layers.into_iter().rev().flat_map(|layer| layer.fields.iter())
    }

    /// Merge `self` followed by `other`, see [`merge`].
    pub fn merged(&self, other: &FieldSet) -> FieldSet {
        FieldSet::from_fields(merge(self.iter().chain(other.iter())))
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        FieldSet::from_fields(iter)
    }
}

/// Concatenate fields in order without dropping duplicates.
///
/// Component tags are the exception: every tag is removed from its position
/// and the segments are joined with `.` into a single component field, placed
/// where the first tag was found. Empty segments are ignored.
pub fn merge<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Vec<Field> {
    let mut out = Vec::new();
    let mut path: Option<(usize, String)> = None;
    for field in fields {
        let Some(segment) = field.component_path() else {
            out.push(field.clone());
            continue;
        };
        if segment.is_empty() {
            continue;
        }
        match &mut path {
            Some((_, joined)) => {
                joined.push('.');
                joined.push_str(segment);
            }
            None => path = Some((out.len(), segment.to_string())),
        }
    }
    if let Some((at, joined)) = path {
        out.insert(at, component(joined));
    }
    out
}
