//! Request-scoped fields.
//!
//! A [`Context`] is an immutable snapshot threaded through calls by value or
//! reference. Attaching fields returns a new context; the parent and any
//! sibling derived from it keep seeing exactly the fields they had.

use crate::field::{Field, FieldSet};

#[derive(Clone, Debug, Default)]
pub struct Context {
    fields: FieldSet,
}

impl Context {
    /// The empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a child context carrying `fields` after the ones already
    /// attached to `self`.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        Context {
            fields: self.fields.with(fields),
        }
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }
}

/// Attach `fields` to `ctx`. Any log call made with the returned context
/// includes them.
pub fn with(ctx: &Context, fields: impl IntoIterator<Item = Field>) -> Context {
    ctx.with(fields)
}

/// The fields attached to `ctx`, empty if none were ever attached.
pub fn fields(ctx: &Context) -> FieldSet {
    ctx.fields.clone()
}
