//! Per-type value strategies.
//!
//! A [`Serializer`] parses and checks raw input for one declared schema type
//! (`validate`), turns stored values into what callers want to read
//! (`resolve`), and renders values for persistence and display. Serializers
//! are looked up by type name in a [`SerializerStore`].

mod builtin;
mod registry;

pub use builtin::{AnySerializer, BooleanSerializer, NumberSerializer, StringSerializer};
pub use registry::SerializerStore;

use async_trait::async_trait;

use crate::error::ValidationError;
use crate::language::Language;
use crate::schema::SchemaEntry;
use crate::types::{Target, Value};

/// What a serializer (or an entry filter) knows about the value it handles.
#[derive(Clone, Copy)]
pub struct SerializerContext<'a> {
    /// Schema leaf the value belongs to.
    pub entry: &'a SchemaEntry,
    pub language: &'a dyn Language,
    /// Entity owning the document, when there is one.
    pub target: Option<&'a dyn Target>,
    /// Caller-supplied extra context, passed through untouched.
    pub extra: Option<&'a Value>,
}

/// Validation and rendering strategy for one schema type.
///
/// Used as `Arc<dyn Serializer>`.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Registered type name (matched case-insensitively).
    fn name(&self) -> &str;

    /// Additional type names served by this serializer.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Parses raw input into the value that gets stored.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the input is not acceptable for
    /// the entry (wrong shape, out of range, ...).
    async fn validate(
        &self,
        data: &Value,
        ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError>;

    /// Turns a stored value into its user-facing form.
    ///
    /// Returning [`Value::Null`] for an array element drops it from the
    /// resolved array.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the stored value cannot be
    /// resolved.
    async fn resolve(
        &self,
        data: &Value,
        _ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError> {
        Ok(data.clone())
    }

    /// Value handed to the provider for persistence.
    fn serialize(&self, data: &Value) -> Value {
        data.clone()
    }

    /// Human-readable rendering.
    fn stringify(&self, data: &Value) -> String {
        data.to_string()
    }
}

/// Checks `value` against the entry's bounds.
///
/// With both bounds set, `inclusive` selects `[min, max]` or `(min, max)`
/// and equal bounds are reported as an exact-value requirement. With one
/// bound only the matching one-sided check applies. `unit` is appended to
/// error messages (e.g. `"characters"` for string lengths).
///
/// # Errors
///
/// Returns the range error describing the violated bound.
#[allow(clippy::float_cmp)]
pub fn min_or_max(
    value: f64,
    entry: &SchemaEntry,
    unit: Option<&'static str>,
) -> Result<(), ValidationError> {
    let inclusive = entry.inclusive();
    let key = entry.path().to_owned();
    match (entry.minimum(), entry.maximum()) {
        (Some(minimum), Some(maximum)) => {
            let within = if inclusive {
                value >= minimum && value <= maximum
            } else {
                value > minimum && value < maximum
            };
            if within {
                Ok(())
            } else if minimum == maximum {
                Err(ValidationError::Exactly {
                    key,
                    value: minimum,
                    unit,
                })
            } else {
                Err(ValidationError::Between {
                    key,
                    minimum,
                    maximum,
                    inclusive,
                    unit,
                })
            }
        }
        (Some(minimum), None) => {
            if (inclusive && value >= minimum) || (!inclusive && value > minimum) {
                Ok(())
            } else {
                Err(ValidationError::Min {
                    key,
                    minimum,
                    inclusive,
                    unit,
                })
            }
        }
        (None, Some(maximum)) => {
            if (inclusive && value <= maximum) || (!inclusive && value < maximum) {
                Ok(())
            } else {
                Err(ValidationError::Max {
                    key,
                    maximum,
                    inclusive,
                    unit,
                })
            }
        }
        (None, None) => Ok(()),
    }
}
