//! Error taxonomy for schema definition, validation and document writes.
//!
//! Every failure of an `update`/`reset` call surfaces as a [`SettingsError`].
//! Narrower enums ([`SchemaError`], [`ValidationError`], [`ArrayPolicyError`],
//! [`KeyError`]) carry the details and convert into it with `?`.

use std::fmt;

use crate::language::Language;

/// A single problem found by `SchemaEntry::check`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryCheckError {
    #[error("[KEY] {path} - Parameter type must be a non-empty string")]
    EmptyType { path: String },

    #[error("[KEY] {path} - {type_name} is not a valid type")]
    UnknownType { path: String, type_name: String },

    #[error("[KEY] {path} - Parameter {bound} must be a finite number")]
    NonFiniteBound { path: String, bound: &'static str },

    #[error("[KEY] {path} - Parameter minimum ({minimum}) must be lower or equal than maximum ({maximum})")]
    InvertedBounds {
        path: String,
        minimum: f64,
        maximum: f64,
    },

    #[error("[DEFAULT] {path} - Default key must be an array if the key is an array")]
    DefaultNotArray { path: String },

    #[error("[DEFAULT] {path} - Default key must be a {expected}")]
    DefaultTypeMismatch { path: String, expected: String },
}

impl EntryCheckError {
    /// Path of the offending entry.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::EmptyType { path }
            | Self::UnknownType { path, .. }
            | Self::NonFiniteBound { path, .. }
            | Self::InvertedBounds { path, .. }
            | Self::DefaultNotArray { path }
            | Self::DefaultTypeMismatch { path, .. } => path,
        }
    }
}

/// Structural schema errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("cannot modify the schema after being initialized (key: {key})")]
    Frozen { key: String },

    #[error("the key {path} is a {found}, it cannot be redefined as a {expected}")]
    TypeConflict {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("keys cannot be empty or contain dots: {key:?}")]
    InvalidKey { key: String },

    #[error("{}", render_check_failures(.problems))]
    Check { problems: Vec<EntryCheckError> },
}

fn render_check_failures(problems: &[EntryCheckError]) -> String {
    let mut out = String::from("[SCHEMA] There is an error with your schema.");
    for problem in problems {
        out.push('\n');
        out.push_str(&problem.to_string());
    }
    out
}

/// Serializer, range and filter failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{key} must be exactly {value}{}", unit_suffix(.unit))]
    Exactly {
        key: String,
        value: f64,
        unit: Option<&'static str>,
    },

    #[error("{key} must be between {minimum} and {maximum}{}{}", inclusive_suffix(.inclusive), unit_suffix(.unit))]
    Between {
        key: String,
        minimum: f64,
        maximum: f64,
        inclusive: bool,
        unit: Option<&'static str>,
    },

    #[error("{key} must be greater than {minimum}{}{}", inclusive_suffix(.inclusive), unit_suffix(.unit))]
    Min {
        key: String,
        minimum: f64,
        inclusive: bool,
        unit: Option<&'static str>,
    },

    #[error("{key} must be less than {maximum}{}{}", inclusive_suffix(.inclusive), unit_suffix(.unit))]
    Max {
        key: String,
        maximum: f64,
        inclusive: bool,
        unit: Option<&'static str>,
    },

    #[error("{key} must be a valid {type_name}")]
    Invalid { key: String, type_name: String },

    #[error("the value {value} for the key {path} is not valid")]
    Filtered { path: String, value: String },

    #[error("{0}")]
    Custom(String),
}

fn inclusive_suffix(inclusive: &bool) -> &'static str {
    if *inclusive {
        " (inclusive)"
    } else {
        ""
    }
}

fn unit_suffix(unit: &Option<&'static str>) -> String {
    unit.map(|u| format!(" {u}")).unwrap_or_default()
}

/// Array merge policy violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArrayPolicyError {
    #[error("The index {index} is bigger than the current array. It must be a value in the range of 0..{max}")]
    IndexOutOfRange { index: usize, max: usize },

    #[error("The value {value} for the key {path} already exists.")]
    AlreadyExists { path: String, value: String },

    #[error("The value {value} for the key {path} does not exist.")]
    DoesNotExist { path: String, value: String },

    #[error("unknown array action: {action}")]
    UnknownAction { action: String },
}

/// Path lookup failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KeyError {
    #[error("the key {path} does not exist in the current data schema")]
    NotFound { path: String },

    #[error("{path} is a folder, choose one of its keys: {}", .keys.join(", "))]
    ChooseKey { path: String, keys: Vec<String> },
}

/// Why a document cannot be written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The document has never been fetched from the backend.
    Unsynchronized,
    /// The folder is not attached to a root document.
    Detached,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsynchronized => f.write_str("the document must be synchronized first"),
            Self::Detached => f.write_str("the folder is not attached to a document"),
        }
    }
}

/// Umbrella error for document reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot modify settings for {id}: {reason}")]
    NotReady { id: String, reason: NotReadyReason },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("the key {path} is not configurable")]
    Unconfigurable { path: String },

    #[error("the folder {path} has no configurable keys")]
    UnconfigurableFolder { path: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ArrayPolicy(#[from] ArrayPolicyError),

    #[error("no serializer registered for type {type_name} (key: {path})")]
    SerializerMissing { path: String, type_name: String },

    #[error("the gateway {gateway} could not find the provider {provider}")]
    ProviderMissing { gateway: String, provider: String },

    #[error("the gateway {gateway} has already been initialized")]
    AlreadyInitialized { gateway: String },

    #[error("backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl SettingsError {
    /// Renders the error through a [`Language`] for display to end users.
    ///
    /// Errors without a user-facing message fall back to their `Display`.
    #[must_use]
    pub fn localize(&self, language: &dyn Language) -> String {
        match self {
            Self::Key(KeyError::NotFound { path }) => {
                language.get("SETTING_GATEWAY_KEY_NOEXT", &[path.clone()])
            }
            Self::Key(KeyError::ChooseKey { keys, .. }) => {
                language.get("SETTING_GATEWAY_CHOOSE_KEY", &[keys.join("`, `")])
            }
            Self::Unconfigurable { path } => {
                language.get("SETTING_GATEWAY_UNCONFIGURABLE_KEY", &[path.clone()])
            }
            Self::UnconfigurableFolder { .. } => {
                language.get("SETTING_GATEWAY_UNCONFIGURABLE_FOLDER", &[])
            }
            Self::Validation(err) => err.localize(language),
            Self::ArrayPolicy(ArrayPolicyError::AlreadyExists { path, value }) => {
                language.get("SETTING_GATEWAY_DUPLICATE_VALUE", &[value.clone(), path.clone()])
            }
            Self::ArrayPolicy(ArrayPolicyError::DoesNotExist { path, value }) => {
                language.get("SETTING_GATEWAY_MISSING_VALUE", &[value.clone(), path.clone()])
            }
            other => other.to_string(),
        }
    }
}

impl ValidationError {
    /// Renders the error through a [`Language`].
    #[must_use]
    pub fn localize(&self, language: &dyn Language) -> String {
        let suffix = |inclusive: bool| if inclusive { "inclusive" } else { "exclusive" };
        match self {
            Self::Exactly { key, value, .. } => {
                language.get("RESOLVER_MINMAX_EXACTLY", &[key.clone(), value.to_string()])
            }
            Self::Between {
                key,
                minimum,
                maximum,
                inclusive,
                ..
            } => language.get(
                "RESOLVER_MINMAX_BOTH",
                &[
                    key.clone(),
                    minimum.to_string(),
                    maximum.to_string(),
                    suffix(*inclusive).to_owned(),
                ],
            ),
            Self::Min {
                key,
                minimum,
                inclusive,
                ..
            } => language.get(
                "RESOLVER_MINMAX_MIN",
                &[key.clone(), minimum.to_string(), suffix(*inclusive).to_owned()],
            ),
            Self::Max {
                key,
                maximum,
                inclusive,
                ..
            } => language.get(
                "RESOLVER_MINMAX_MAX",
                &[key.clone(), maximum.to_string(), suffix(*inclusive).to_owned()],
            ),
            Self::Filtered { path, value } => language.get(
                "SETTING_GATEWAY_INVALID_FILTERED_VALUE",
                &[path.clone(), value.clone()],
            ),
            other => other.to_string(),
        }
    }
}
