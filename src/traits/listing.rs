//! Child enumeration.

use crate::traits::{EntityCore, EntityRef};
use crate::{EntityFilter, FileError};

/// Child listing.
///
/// A backend that cannot enumerate or parse its listing fails with
/// [`FileError::Io`]; it never returns a partial or silently empty listing.
pub trait EntityListing: EntityCore {
    /// All direct children.
    ///
    /// # Errors
    ///
    /// - [`FileError::NotADirectory`] if the entity is not directory-like
    /// - [`FileError::Io`] if the listing cannot be retrieved or parsed
    fn ls(&self) -> Result<Vec<EntityRef>, FileError>;

    /// Direct children accepted by `filter`.
    ///
    /// # Errors
    ///
    /// Same as [`ls`](Self::ls).
    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_listing_is_object_safe() {
        fn _check(_: &dyn EntityListing) {}
    }
}
