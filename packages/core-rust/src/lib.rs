//! Settings gateway core: schema tree, serializers, settings documents and the
//! update/reset diff engine.

pub mod error;
pub mod language;
pub mod schema;
pub mod serializer;
pub mod settings;
pub mod types;

pub use error::{
    ArrayPolicyError, EntryCheckError, KeyError, NotReadyReason, SchemaError, SettingsError,
    ValidationError,
};
pub use language::{DefaultLanguage, Language};
pub use schema::{EntryFilter, Schema, SchemaEntry, SchemaEntryOptions, SchemaFolder, SchemaNode};
pub use serializer::{min_or_max, Serializer, SerializerContext, SerializerStore};
pub use settings::{
    ArrayAction, Change, DocumentContext, ExistenceStatus, Planner, ResetOptions, ResetPaths,
    SettingsFolder, SettingsNode, UpdateInput, UpdateOptions,
};
pub use types::{EntityRef, Target, Value};
