use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::EntryCheckError;
use crate::language::Language;
use crate::serializer::{Serializer, SerializerContext, SerializerStore};
use crate::types::{Target, Value};

/// Predicate run on every validated value. Returning `true` rejects it.
pub type EntryFilter = Arc<dyn Fn(&Value, &SerializerContext<'_>) -> bool + Send + Sync>;

/// Optional settings for [`SchemaEntry::new`] and [`SchemaEntry::edit`].
///
/// Unset fields take their computed defaults on creation and are left alone
/// on edit.
#[derive(Clone, Default)]
pub struct SchemaEntryOptions {
    pub array: Option<bool>,
    pub configurable: Option<bool>,
    pub default: Option<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub inclusive: Option<bool>,
    pub filter: Option<EntryFilter>,
    pub resolve: Option<bool>,
}

impl SchemaEntryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn array(mut self, array: bool) -> Self {
        self.array = Some(array);
        self
    }

    #[must_use]
    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    #[must_use]
    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    #[must_use]
    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Value, &SerializerContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn resolve(mut self, resolve: bool) -> Self {
        self.resolve = Some(resolve);
        self
    }
}

/// Leaf of a schema: one typed setting.
#[derive(Clone)]
pub struct SchemaEntry {
    key: String,
    path: String,
    type_name: String,
    array: bool,
    default: Value,
    minimum: Option<f64>,
    maximum: Option<f64>,
    inclusive: bool,
    configurable: bool,
    filter: Option<EntryFilter>,
    should_resolve: bool,
    serializer: OnceLock<Arc<dyn Serializer>>,
}

impl SchemaEntry {
    /// Creates a leaf under `parent_path` (empty for the root).
    ///
    /// The type name is lowercased. `array` defaults to whether the supplied
    /// default is an array; the default value defaults to `[]` for arrays,
    /// `false` for booleans and `null` otherwise; `configurable` defaults to
    /// `type != "any"`.
    #[must_use]
    pub fn new(
        parent_path: &str,
        key: impl Into<String>,
        type_name: &str,
        options: SchemaEntryOptions,
    ) -> Self {
        let key = key.into();
        let path = if parent_path.is_empty() {
            key.clone()
        } else {
            format!("{parent_path}.{key}")
        };
        let type_name = type_name.to_lowercase();
        let array = options
            .array
            .unwrap_or_else(|| options.default.as_ref().is_some_and(Value::is_array));
        let default = options
            .default
            .unwrap_or_else(|| generate_default(array, &type_name));
        let configurable = options.configurable.unwrap_or(type_name != "any");
        Self {
            key,
            path,
            type_name,
            array,
            default,
            minimum: options.minimum,
            maximum: options.maximum,
            inclusive: options.inclusive.unwrap_or(false),
            configurable,
            filter: options.filter,
            should_resolve: options.resolve.unwrap_or(true),
            serializer: OnceLock::new(),
        }
    }

    /// Applies the supplied fields of `options`, and the type when given.
    ///
    /// Supplying either bound replaces both bounds.
    pub fn edit(&mut self, type_name: Option<&str>, options: SchemaEntryOptions) {
        if let Some(type_name) = type_name {
            let lowered = type_name.to_lowercase();
            if lowered != self.type_name {
                self.type_name = lowered;
                self.serializer = OnceLock::new();
            }
        }
        if let Some(array) = options.array {
            self.array = array;
        }
        if let Some(configurable) = options.configurable {
            self.configurable = configurable;
        }
        if let Some(default) = options.default {
            self.default = default;
        }
        if options.minimum.is_some() || options.maximum.is_some() {
            self.minimum = options.minimum;
            self.maximum = options.maximum;
        }
        if let Some(inclusive) = options.inclusive {
            self.inclusive = inclusive;
        }
        if let Some(filter) = options.filter {
            self.filter = Some(filter);
        }
        if let Some(resolve) = options.resolve {
            self.should_resolve = resolve;
        }
    }

    /// Verifies the entry against the registered serializers and caches its
    /// serializer on success.
    ///
    /// # Errors
    ///
    /// Returns every problem found, not just the first.
    pub fn check(&self, serializers: &SerializerStore) -> Result<(), Vec<EntryCheckError>> {
        let mut problems = Vec::new();
        let path = || self.path.clone();

        if self.type_name.is_empty() {
            problems.push(EntryCheckError::EmptyType { path: path() });
        } else if let Some(serializer) = serializers.get(&self.type_name) {
            let _ = self.serializer.set(Arc::clone(serializer));
        } else {
            problems.push(EntryCheckError::UnknownType {
                path: path(),
                type_name: self.type_name.clone(),
            });
        }

        for (bound, value) in [("minimum", self.minimum), ("maximum", self.maximum)] {
            if value.is_some_and(|v| !v.is_finite()) {
                problems.push(EntryCheckError::NonFiniteBound {
                    path: path(),
                    bound,
                });
            }
        }
        if let (Some(minimum), Some(maximum)) = (self.minimum, self.maximum) {
            if minimum > maximum {
                problems.push(EntryCheckError::InvertedBounds {
                    path: path(),
                    minimum,
                    maximum,
                });
            }
        }

        if self.array {
            if !self.default.is_array() {
                problems.push(EntryCheckError::DefaultNotArray { path: path() });
            }
        } else if matches!(self.type_name.as_str(), "boolean" | "string")
            && !self.default.is_null()
            && self.default.type_name() != self.type_name
        {
            problems.push(EntryCheckError::DefaultTypeMismatch {
                path: path(),
                expected: self.type_name.clone(),
            });
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Builds the context handed to this entry's serializer and filter.
    #[must_use]
    pub fn context<'a>(
        &'a self,
        language: &'a dyn Language,
        target: Option<&'a dyn Target>,
        extra: Option<&'a Value>,
    ) -> SerializerContext<'a> {
        SerializerContext {
            entry: self,
            language,
            target,
            extra,
        }
    }

    /// Serialized description of the entry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.type_name,
            "array": self.array,
            "configurable": self.configurable,
            "default": self.default.to_json(),
            "inclusive": self.inclusive,
            "maximum": self.maximum,
            "minimum": self.minimum,
            "resolve": self.should_resolve,
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dotted path from the schema root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn array(&self) -> bool {
        self.array
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    #[must_use]
    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    #[must_use]
    pub fn configurable(&self) -> bool {
        self.configurable
    }

    #[must_use]
    pub fn filter(&self) -> Option<&EntryFilter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn should_resolve(&self) -> bool {
        self.should_resolve
    }

    /// Serializer cached by a successful [`check`](Self::check).
    #[must_use]
    pub fn serializer(&self) -> Option<&Arc<dyn Serializer>> {
        self.serializer.get()
    }
}

fn generate_default(array: bool, type_name: &str) -> Value {
    if array {
        Value::Array(Vec::new())
    } else if type_name == "boolean" {
        Value::Bool(false)
    } else {
        Value::Null
    }
}

impl fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("path", &self.path)
            .field("type", &self.type_name)
            .field("array", &self.array)
            .field("default", &self.default)
            .field("minimum", &self.minimum)
            .field("maximum", &self.maximum)
            .field("inclusive", &self.inclusive)
            .field("configurable", &self.configurable)
            .field("filter", &self.filter.is_some())
            .field("resolve", &self.should_resolve)
            .finish_non_exhaustive()
    }
}
