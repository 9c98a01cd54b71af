//! Volume space queries.

use crate::FileError;
use crate::traits::EntityCore;

/// Free and total space of the volume an entity lives on.
pub trait EntitySpace: EntityCore {
    /// Bytes available to the caller.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend cannot report space.
    fn free_space(&self) -> Result<u64, FileError>;

    /// Total bytes of the volume.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend cannot report space.
    fn total_space(&self) -> Result<u64, FileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_space_is_object_safe() {
        fn _check(_: &dyn EntitySpace) {}
    }
}
