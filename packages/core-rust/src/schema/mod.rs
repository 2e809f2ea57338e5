//! Schema tree: typed leaves ([`SchemaEntry`]) grouped in folders
//! ([`SchemaFolder`]) under a root [`Schema`].
//!
//! A schema is built up front, then frozen when a gateway takes ownership of
//! it. Structural edits on a frozen schema are rejected.

mod entry;
mod folder;

use std::ops::Deref;

pub use entry::{EntryFilter, SchemaEntry, SchemaEntryOptions};
pub use folder::{SchemaFolder, SchemaNode};

use crate::error::SchemaError;

/// Root of a schema tree (path `""`).
///
/// Read access goes through [`Deref`] to the root [`SchemaFolder`]; edits go
/// through the methods below, which check the frozen flag first.
#[derive(Debug, Clone)]
pub struct Schema {
    root: SchemaFolder,
    frozen: bool,
}

impl Schema {
    /// Creates an empty, editable schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: SchemaFolder::root(),
            frozen: false,
        }
    }

    /// Adds or edits a leaf.
    ///
    /// # Errors
    ///
    /// Fails when the schema is frozen, or see [`SchemaFolder::add`].
    pub fn add(
        &mut self,
        key: &str,
        type_name: &str,
        options: SchemaEntryOptions,
    ) -> Result<&mut Self, SchemaError> {
        self.ensure_editable(key)?;
        self.root.add(key, type_name, options)?;
        Ok(self)
    }

    /// Adds or extends a folder.
    ///
    /// # Errors
    ///
    /// Fails when the schema is frozen, or see [`SchemaFolder::add_folder`].
    pub fn add_folder<F>(&mut self, key: &str, build: F) -> Result<&mut Self, SchemaError>
    where
        F: FnOnce(&mut SchemaFolder) -> Result<(), SchemaError>,
    {
        self.ensure_editable(key)?;
        self.root.add_folder(key, build)?;
        Ok(self)
    }

    /// Removes a child of the root.
    ///
    /// # Errors
    ///
    /// Fails when the schema is frozen.
    pub fn delete(&mut self, key: &str) -> Result<bool, SchemaError> {
        self.ensure_editable(key)?;
        Ok(self.root.delete(key))
    }

    /// Locks the schema against further structural edits.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_editable(&self, key: &str) -> Result<(), SchemaError> {
        if self.frozen {
            Err(SchemaError::Frozen {
                key: key.to_owned(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Schema {
    type Target = SchemaFolder;

    fn deref(&self) -> &SchemaFolder {
        &self.root
    }
}
