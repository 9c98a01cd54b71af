//! Behaviour shared by backend implementations.

use parking_lot::Mutex;

use crate::{EntityFilter, EntityRef, FileEntity, FileError};

/// Lazily resolved, externally settable parent reference.
///
/// The first [`get_or_resolve`](Self::get_or_resolve) runs the resolver and
/// caches its answer (including "no parent"). [`set`](Self::set) overrides
/// the cache, which is how a listing hands its children their parent.
#[derive(Default)]
pub struct ParentSlot {
    slot: Mutex<Option<Option<EntityRef>>>,
}

impl ParentSlot {
    /// An unresolved slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached parent, resolving it first if needed.
    pub fn get_or_resolve<F>(&self, resolve: F) -> Option<EntityRef>
    where
        F: FnOnce() -> Option<EntityRef>,
    {
        let mut slot = self.slot.lock();
        if let Some(parent) = slot.as_ref() {
            return parent.clone();
        }
        let parent = resolve();
        *slot = Some(parent.clone());
        parent
    }

    /// Override the cached parent.
    pub fn set(&self, parent: Option<EntityRef>) {
        *self.slot.lock() = Some(parent);
    }

    /// Whether the parent has been resolved or set.
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Reject a move or copy between different volumes before touching either
/// entity.
pub fn ensure_same_volume(source: &dyn FileEntity, destination: &dyn FileEntity) -> Result<(), FileError> {
    let same = source.backend_kind() == destination.backend_kind()
        && source.volume().location() == destination.volume().location();
    if same {
        Ok(())
    } else {
        Err(FileError::VolumeMismatch {
            from: source.location().to_string(),
            to: destination.location().to_string(),
        })
    }
}

/// `ls` followed by a filter, for backends without server-side filtering.
pub fn ls_filtered_via<E>(entity: &E, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError>
where
    E: FileEntity + ?Sized,
{
    Ok(filter.filter_entities(entity.ls()?))
}

/// The topmost ancestor of an entity (itself when it has no parent).
pub fn topmost_ancestor(entity: EntityRef) -> EntityRef {
    let mut current = entity;
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}
