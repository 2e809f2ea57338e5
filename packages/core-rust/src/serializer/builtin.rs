//! Reference serializers for the primitive schema types.

use async_trait::async_trait;

use super::{min_or_max, Serializer, SerializerContext};
use crate::error::ValidationError;
use crate::types::Value;

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "enable", "enabled", "1", "+"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "disable", "disabled", "0", "-"];

fn invalid(ctx: &SerializerContext<'_>) -> ValidationError {
    ValidationError::Invalid {
        key: ctx.entry.path().to_owned(),
        type_name: ctx.entry.type_name().to_owned(),
    }
}

/// Accepts any value unchanged. Entries of this type are not configurable
/// by default.
pub struct AnySerializer;

#[async_trait]
impl Serializer for AnySerializer {
    fn name(&self) -> &str {
        "any"
    }

    async fn validate(
        &self,
        data: &Value,
        _ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError> {
        Ok(data.clone())
    }
}

/// Booleans, plus the usual yes/no spellings.
pub struct BooleanSerializer;

#[async_trait]
impl Serializer for BooleanSerializer {
    fn name(&self) -> &str {
        "boolean"
    }

    async fn validate(
        &self,
        data: &Value,
        ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError> {
        match data {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::String(s) => {
                let lowered = s.trim().to_lowercase();
                if TRUTHY.contains(&lowered.as_str()) {
                    Ok(Value::Bool(true))
                } else if FALSY.contains(&lowered.as_str()) {
                    Ok(Value::Bool(false))
                } else {
                    Err(invalid(ctx))
                }
            }
            _ => Err(invalid(ctx)),
        }
    }

    fn stringify(&self, data: &Value) -> String {
        match data {
            Value::Bool(true) => "Enabled".to_owned(),
            Value::Bool(false) => "Disabled".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Numbers. Registered as `number` with the `integer` and `float` aliases;
/// entries typed `integer` reject fractional input.
pub struct NumberSerializer;

impl NumberSerializer {
    fn parse(data: &Value) -> Option<Value> {
        match data {
            Value::Int(_) => Some(data.clone()),
            Value::Float(f) if f.is_finite() => Some(data.clone()),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .map(Value::Int)
                    .ok()
                    .or_else(|| {
                        trimmed
                            .parse::<f64>()
                            .ok()
                            .filter(|f| f.is_finite())
                            .map(Value::Float)
                    })
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Serializer for NumberSerializer {
    fn name(&self) -> &str {
        "number"
    }

    fn aliases(&self) -> &[&'static str] {
        &["integer", "float"]
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    async fn validate(
        &self,
        data: &Value,
        ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError> {
        let parsed = Self::parse(data).ok_or_else(|| invalid(ctx))?;
        let parsed = match (ctx.entry.type_name(), parsed) {
            ("integer", Value::Float(f)) if f.trunc() == f => Value::Int(f as i64),
            ("integer", Value::Float(_)) => return Err(invalid(ctx)),
            ("float", Value::Int(i)) => Value::Float(i as f64),
            (_, value) => value,
        };
        if let Some(number) = parsed.as_f64() {
            min_or_max(number, ctx.entry, None)?;
        }
        Ok(parsed)
    }
}

/// Strings. Bounds apply to the length in characters.
pub struct StringSerializer;

#[async_trait]
impl Serializer for StringSerializer {
    fn name(&self) -> &str {
        "string"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn validate(
        &self,
        data: &Value,
        ctx: &SerializerContext<'_>,
    ) -> Result<Value, ValidationError> {
        let text = match data {
            Value::String(s) => s.clone(),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => data.to_string(),
            _ => return Err(invalid(ctx)),
        };
        min_or_max(text.chars().count() as f64, ctx.entry, Some("characters"))?;
        Ok(Value::String(text))
    }
}
