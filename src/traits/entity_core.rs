//! Identity and capability introspection.

use crate::{BackendKind, FileOperation, Location};

/// Identity and capability introspection shared by every component trait.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Metadata reads and listing may
/// be called from several threads; mutation of one entity from several
/// threads at once has no defined outcome.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn EntityCore`.
pub trait EntityCore: Send + Sync {
    /// The entity's identity.
    fn location(&self) -> &Location;

    /// The backend family.
    fn backend_kind(&self) -> BackendKind;

    /// Whether `operation` can be performed on this entity.
    ///
    /// Callers probe this before invoking optional operations instead of
    /// relying on [`FileError::Unsupported`](crate::FileError::Unsupported)
    /// as control flow.
    fn supports(&self, operation: FileOperation) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_core_is_object_safe() {
        fn _check(_: &dyn EntityCore) {}
    }

    #[test]
    fn entity_core_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: EntityCore>() {
            _assert_send_sync::<T>();
        }
    }
}
