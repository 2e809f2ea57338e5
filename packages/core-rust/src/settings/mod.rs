//! Settings documents: the value tree, change records, and the update/reset
//! planning engine.

mod change;
mod folder;
mod resolve;
mod update;

pub use change::{changes_to_patch, flatten, nest, Change};
pub use folder::{SettingsFolder, SettingsNode};
pub use resolve::resolve;
pub use update::{ArrayAction, Planner, ResetOptions, ResetPaths, UpdateInput, UpdateOptions};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::serializer::SerializerStore;
use crate::types::Target;

/// Where a document stands relative to its backend row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistenceStatus {
    /// Never fetched. Writes are refused until a sync completes.
    #[default]
    Unsynchronized,
    /// A backend row exists.
    Exists,
    /// Fetched, and no backend row exists.
    NotExists,
}

impl fmt::Display for ExistenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsynchronized => "unsynchronized",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
        })
    }
}

/// Collaborators the value pipeline needs for one document.
#[derive(Clone, Copy)]
pub struct DocumentContext<'a> {
    /// Fallback lookup for entries whose serializer was not cached by a
    /// schema check.
    pub serializers: &'a SerializerStore,
    pub language: &'a dyn Language,
    pub target: Option<&'a dyn Target>,
}
