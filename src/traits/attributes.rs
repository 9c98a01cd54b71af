//! Attribute getters and mutators.

use std::time::SystemTime;

use crate::traits::EntityCore;
use crate::{ChangeablePermissions, FileError, FilePermissions};

/// Type queries and metadata.
///
/// Getters never fail: a backend that cannot resolve a value returns its
/// "unknown" form (`false`, `None`, [`FilePermissions::EMPTY`]). Remote
/// backends answer from a [`SyncedAttributes`](crate::SyncedAttributes)
/// cache, so a warm getter performs no I/O.
pub trait EntityAttributes: EntityCore {
    /// Whether the entity exists.
    fn exists(&self) -> bool;

    /// Whether the entity is a directory (or a directory-like level).
    fn is_directory(&self) -> bool;

    /// Whether the entity is a symbolic link.
    fn is_symlink(&self) -> bool;

    /// Whether the entity is hidden.
    fn is_hidden(&self) -> bool;

    /// Whether the entity is a system file.
    fn is_system(&self) -> bool;

    /// Size in bytes, `None` when unknown.
    fn size(&self) -> Option<u64>;

    /// Last modification date, `None` when unknown.
    fn date(&self) -> Option<SystemTime>;

    /// Change the modification date.
    ///
    /// # Errors
    ///
    /// - [`FileError::Unsupported`] if the backend cannot change dates
    /// - [`FileError::NotFound`] if the entity does not exist
    fn change_date(&self, date: SystemTime) -> Result<(), FileError>;

    /// Current permission bits.
    fn permissions(&self) -> FilePermissions;

    /// Bits [`change_permissions`](Self::change_permissions) may touch.
    fn changeable_permissions(&self) -> ChangeablePermissions;

    /// Replace the permission bits.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if a bit outside
    /// [`changeable_permissions`](Self::changeable_permissions) would change.
    fn change_permissions(&self, permissions: u16) -> Result<(), FileError>;

    /// Owner name, `None` if unknown or unsupported.
    fn owner(&self) -> Option<String>;

    /// Group name, `None` if unknown or unsupported.
    fn group(&self) -> Option<String>;

    /// Whether [`owner`](Self::owner) can return a value on this backend.
    fn can_get_owner(&self) -> bool;

    /// Whether [`group`](Self::group) can return a value on this backend.
    fn can_get_group(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_attributes_is_object_safe() {
        fn _check(_: &dyn EntityAttributes) {}
    }
}
