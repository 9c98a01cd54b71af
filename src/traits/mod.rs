//! # File-Entity Traits
//!
//! The capability contract every backend implements.
//!
//! ## Component Traits
//!
//! The contract is split into component traits, each building on
//! [`EntityCore`] (identity and capability introspection):
//!
//! ```text
//! EntityCore
//!   ├── EntityAttributes  exists, type flags, size, date, permissions, owner/group
//!   ├── EntityNavigation  parent, root, volume
//!   ├── EntityContent     input/output/append/random-access streams
//!   ├── EntityMutation    mkdir, delete, rename, server-side copy
//!   ├── EntityListing     ls, ls_filtered
//!   └── EntitySpace       free/total space
//!                           ↓
//!                      FileEntity
//! ```
//!
//! ## Quick Reference
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`EntityCore`] | `location`, `backend_kind`, `supports` |
//! | [`EntityAttributes`] | `exists`, `is_directory`, `is_symlink`, `is_hidden`, `is_system`, `size`, `date`, `change_date`, `permissions`, `changeable_permissions`, `change_permissions`, `owner`, `group`, `can_get_owner`, `can_get_group` |
//! | [`EntityNavigation`] | `parent`, `set_parent`, `root`, `is_root`, `volume` |
//! | [`EntityContent`] | `input_stream`, `output_stream`, `append_stream`, `random_access_input`, `random_access_output` |
//! | [`EntityMutation`] | `mkdir`, `delete`, `rename_to`, `copy_remotely_to` |
//! | [`EntityListing`] | `ls`, `ls_filtered` |
//! | [`EntitySpace`] | `free_space`, `total_space` |
//!
//! No component trait has default methods: a backend or decorator that
//! forgets an operation does not compile.
//!
//! ## Blanket Implementation
//!
//! [`FileEntity`] is implemented for every type implementing all the
//! component traits.
//!
//! ## Identity
//!
//! `dyn FileEntity` implements `PartialEq`, `Eq` and `Hash` through its
//! [`Location`](crate::Location): two entities are equal iff their locations
//! are, whatever backend object or decorator stands behind them.

mod attributes;
mod content;
mod entity_core;
mod listing;
mod mutation;
mod navigation;
mod space;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use attributes::EntityAttributes;
pub use content::EntityContent;
pub use entity_core::EntityCore;
pub use listing::EntityListing;
pub use mutation::EntityMutation;
pub use navigation::EntityNavigation;
pub use space::EntitySpace;

/// A complete file entity.
///
/// # Example
///
/// ```rust
/// use anyfile::{FileEntity, FileError, FileOperation};
///
/// // Generic function that works with any backend
/// fn total_size(dir: &dyn FileEntity) -> Result<u64, FileError> {
///     if !dir.supports(FileOperation::ListChildren) {
///         return Ok(0);
///     }
///     Ok(dir.ls()?.iter().filter_map(|child| child.size()).sum())
/// }
/// ```
pub trait FileEntity:
    EntityAttributes + EntityNavigation + EntityContent + EntityMutation + EntityListing + EntitySpace
{
}

// Blanket implementation - any type implementing all components gets FileEntity for free
impl<T> FileEntity for T where
    T: EntityAttributes
        + EntityNavigation
        + EntityContent
        + EntityMutation
        + EntityListing
        + EntitySpace
{
}

/// Shared handle to an entity of any backend.
pub type EntityRef = Arc<dyn FileEntity>;

impl PartialEq for dyn FileEntity {
    fn eq(&self, other: &Self) -> bool {
        self.location() == other.location()
    }
}

impl Eq for dyn FileEntity {}

impl Hash for dyn FileEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location().hash(state);
    }
}

impl fmt::Debug for dyn FileEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntity")
            .field("kind", &self.backend_kind())
            .field("location", self.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_entity_is_object_safe() {
        fn _check(_: &dyn FileEntity) {}
    }

    #[test]
    fn entity_ref_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EntityRef>();
    }
}
