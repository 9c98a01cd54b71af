//! Mutating operations.

use crate::FileError;
use crate::traits::{EntityCore, FileEntity};

/// Create, delete, rename and copy.
pub trait EntityMutation: EntityCore {
    /// Create this entity as a directory.
    ///
    /// # Errors
    ///
    /// - [`FileError::AlreadyExists`] if something exists at this location
    /// - [`FileError::NotFound`] if the parent does not exist
    fn mkdir(&self) -> Result<(), FileError>;

    /// Delete this entity (directories must be empty).
    ///
    /// # Errors
    ///
    /// - [`FileError::NotFound`] if the entity does not exist
    /// - [`FileError::Unsupported`] if this level of a hierarchy cannot be deleted
    fn delete(&self) -> Result<(), FileError>;

    /// Move this entity to `destination`, replacing it if it exists.
    ///
    /// Moves across volumes are rejected up front so that no silent,
    /// untracked copy happens; neither entity is touched in that case.
    ///
    /// # Errors
    ///
    /// - [`FileError::VolumeMismatch`] if the resolved volumes differ
    /// - [`FileError::Unsupported`] if the backend cannot rename
    fn rename_to(&self, destination: &dyn FileEntity) -> Result<(), FileError>;

    /// Copy this entity to `destination` without streaming through the
    /// client (server-side copy).
    ///
    /// # Errors
    ///
    /// - [`FileError::VolumeMismatch`] if `destination` is on another realm
    /// - [`FileError::Unsupported`] if the backend has no server-side copy
    fn copy_remotely_to(&self, destination: &dyn FileEntity) -> Result<(), FileError>;
}
