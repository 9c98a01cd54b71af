//! Memoizing decorator.

use std::sync::{Arc, OnceLock, Weak};
use std::time::SystemTime;

use crate::common::ParentSlot;
use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityRef, FileEntity, FileError,
    FileOperation, FilePermissions, InputStream, Location, OutputStream, RandomAccessInput,
    RandomAccessOutput,
};

/// Caches every getter's first answer for the lifetime of the wrapper.
///
/// Each getter queries the inner entity at most once; later calls return
/// the first-observed value even if the backend changed since. Fallible
/// getters (space queries) cache successes only.
///
/// Listing is never cached, so enumeration stays live. With `recursive`,
/// listed children, the parent, the root and the volume are wrapped in
/// caching decorators too, and each child's parent is set to this wrapper,
/// so a subtree snapshot is internally consistent.
///
/// Mutations are forwarded and do not refresh cached values: drop the
/// wrapper to see new state.
pub struct CachedEntity {
    inner: EntityRef,
    recursive: bool,
    this: Weak<CachedEntity>,
    exists: OnceLock<bool>,
    is_directory: OnceLock<bool>,
    is_symlink: OnceLock<bool>,
    is_hidden: OnceLock<bool>,
    is_system: OnceLock<bool>,
    size: OnceLock<Option<u64>>,
    date: OnceLock<Option<SystemTime>>,
    permissions: OnceLock<FilePermissions>,
    changeable_permissions: OnceLock<ChangeablePermissions>,
    owner: OnceLock<Option<String>>,
    group: OnceLock<Option<String>>,
    can_get_owner: OnceLock<bool>,
    can_get_group: OnceLock<bool>,
    parent: ParentSlot,
    root: OnceLock<EntityRef>,
    is_root: OnceLock<bool>,
    volume: OnceLock<EntityRef>,
    free_space: OnceLock<u64>,
    total_space: OnceLock<u64>,
}

impl CachedEntity {
    /// Wrap `inner`.
    pub fn new(inner: EntityRef, recursive: bool) -> Arc<CachedEntity> {
        Arc::new_cyclic(|this| CachedEntity {
            inner,
            recursive,
            this: this.clone(),
            exists: OnceLock::new(),
            is_directory: OnceLock::new(),
            is_symlink: OnceLock::new(),
            is_hidden: OnceLock::new(),
            is_system: OnceLock::new(),
            size: OnceLock::new(),
            date: OnceLock::new(),
            permissions: OnceLock::new(),
            changeable_permissions: OnceLock::new(),
            owner: OnceLock::new(),
            group: OnceLock::new(),
            can_get_owner: OnceLock::new(),
            can_get_group: OnceLock::new(),
            parent: ParentSlot::new(),
            root: OnceLock::new(),
            is_root: OnceLock::new(),
            volume: OnceLock::new(),
            free_space: OnceLock::new(),
            total_space: OnceLock::new(),
        })
    }

    /// Wrap `inner` as a shared entity reference.
    pub fn wrap(inner: EntityRef, recursive: bool) -> EntityRef {
        Self::new(inner, recursive)
    }

    /// The wrapped entity.
    pub fn inner(&self) -> &EntityRef {
        &self.inner
    }

    /// Whether related entities are wrapped too.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    fn related(&self, entity: EntityRef) -> EntityRef {
        if self.recursive {
            CachedEntity::wrap(entity, true)
        } else {
            entity
        }
    }

    fn adopt(&self, children: Vec<EntityRef>) -> Vec<EntityRef> {
        if !self.recursive {
            return children;
        }
        let this: Option<EntityRef> = self.this.upgrade().map(|this| this as EntityRef);
        children
            .into_iter()
            .map(|child| {
                let child = CachedEntity::wrap(child, true);
                child.set_parent(this.clone());
                child
            })
            .collect()
    }

    fn cached_result(slot: &OnceLock<u64>, fetch: impl FnOnce() -> Result<u64, FileError>) -> Result<u64, FileError> {
        if let Some(value) = slot.get() {
            return Ok(*value);
        }
        let value = fetch()?;
        Ok(*slot.get_or_init(|| value))
    }
}

impl EntityCore for CachedEntity {
    fn location(&self) -> &Location {
        self.inner.location()
    }

    fn backend_kind(&self) -> BackendKind {
        self.inner.backend_kind()
    }

    fn supports(&self, operation: FileOperation) -> bool {
        self.inner.supports(operation)
    }
}

impl EntityAttributes for CachedEntity {
    fn exists(&self) -> bool {
        *self.exists.get_or_init(|| self.inner.exists())
    }

    fn is_directory(&self) -> bool {
        *self.is_directory.get_or_init(|| self.inner.is_directory())
    }

    fn is_symlink(&self) -> bool {
        *self.is_symlink.get_or_init(|| self.inner.is_symlink())
    }

    fn is_hidden(&self) -> bool {
        *self.is_hidden.get_or_init(|| self.inner.is_hidden())
    }

    fn is_system(&self) -> bool {
        *self.is_system.get_or_init(|| self.inner.is_system())
    }

    fn size(&self) -> Option<u64> {
        *self.size.get_or_init(|| self.inner.size())
    }

    fn date(&self) -> Option<SystemTime> {
        *self.date.get_or_init(|| self.inner.date())
    }

    fn change_date(&self, date: SystemTime) -> Result<(), FileError> {
        self.inner.change_date(date)
    }

    fn permissions(&self) -> FilePermissions {
        *self.permissions.get_or_init(|| self.inner.permissions())
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        *self
            .changeable_permissions
            .get_or_init(|| self.inner.changeable_permissions())
    }

    fn change_permissions(&self, bits: u16) -> Result<(), FileError> {
        self.inner.change_permissions(bits)
    }

    fn owner(&self) -> Option<String> {
        self.owner.get_or_init(|| self.inner.owner()).clone()
    }

    fn group(&self) -> Option<String> {
        self.group.get_or_init(|| self.inner.group()).clone()
    }

    fn can_get_owner(&self) -> bool {
        *self.can_get_owner.get_or_init(|| self.inner.can_get_owner())
    }

    fn can_get_group(&self) -> bool {
        *self.can_get_group.get_or_init(|| self.inner.can_get_group())
    }
}

impl EntityNavigation for CachedEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.parent
            .get_or_resolve(|| self.inner.parent().map(|parent| self.related(parent)))
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.parent.set(parent.clone());
        self.inner.set_parent(parent);
    }

    fn root(&self) -> EntityRef {
        Arc::clone(self.root.get_or_init(|| self.related(self.inner.root())))
    }

    fn is_root(&self) -> bool {
        *self.is_root.get_or_init(|| self.inner.is_root())
    }

    fn volume(&self) -> EntityRef {
        Arc::clone(self.volume.get_or_init(|| self.related(self.inner.volume())))
    }
}

impl EntityContent for CachedEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        self.inner.input_stream()
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        self.inner.output_stream()
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        self.inner.append_stream()
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        self.inner.random_access_input()
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        self.inner.random_access_output()
    }
}

impl EntityMutation for CachedEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        self.inner.mkdir()
    }

    fn delete(&self) -> Result<(), FileError> {
        self.inner.delete()
    }

    fn rename_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        self.inner.rename_to(destination)
    }

    fn copy_remotely_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        self.inner.copy_remotely_to(destination)
    }
}

impl EntityListing for CachedEntity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        Ok(self.adopt(self.inner.ls()?))
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        Ok(self.adopt(self.inner.ls_filtered(filter)?))
    }
}

impl EntitySpace for CachedEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        Self::cached_result(&self.free_space, || self.inner.free_space())
    }

    fn total_space(&self) -> Result<u64, FileError> {
        Self::cached_result(&self.total_space, || self.inner.total_space())
    }
}
