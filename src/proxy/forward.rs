//! Plain forwarding decorator.

use std::time::SystemTime;

use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityRef, FileEntity, FileError,
    FileOperation, FilePermissions, InputStream, Location, OutputStream, RandomAccessInput,
    RandomAccessOutput,
};

/// Delegates every operation to an inner entity, unchanged.
///
/// The starting point for feature-adding wrappers: copy it and override the
/// operations the feature touches.
pub struct ProxyEntity {
    inner: EntityRef,
}

impl ProxyEntity {
    /// Wrap `inner`.
    pub fn new(inner: EntityRef) -> Self {
        Self { inner }
    }

    /// The wrapped entity.
    pub fn inner(&self) -> &EntityRef {
        &self.inner
    }

    /// Unwrap.
    pub fn into_inner(self) -> EntityRef {
        self.inner
    }
}

impl EntityCore for ProxyEntity {
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

impl EntityAttributes for ProxyEntity {
    fn exists(&self) -> bool {
        self.inner.exists()
    }

    fn is_directory(&self) -> bool {
        self.inner.is_directory()
    }

    fn is_symlink(&self) -> bool {
        self.inner.is_symlink()
    }

    fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    fn is_system(&self) -> bool {
        self.inner.is_system()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }

    fn date(&self) -> Option<SystemTime> {
        self.inner.date()
    }

    fn change_date(&self, date: SystemTime) -> Result<(), FileError> {
        self.inner.change_date(date)
    }

    fn permissions(&self) -> FilePermissions {
        self.inner.permissions()
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        self.inner.changeable_permissions()
    }

    fn change_permissions(&self, bits: u16) -> Result<(), FileError> {
        self.inner.change_permissions(bits)
    }

    fn owner(&self) -> Option<String> {
        self.inner.owner()
    }

    fn group(&self) -> Option<String> {
        self.inner.group()
    }

    fn can_get_owner(&self) -> bool {
        self.inner.can_get_owner()
    }

    fn can_get_group(&self) -> bool {
        self.inner.can_get_group()
    }
}

impl EntityNavigation for ProxyEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.inner.parent()
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.inner.set_parent(parent)
    }

    fn root(&self) -> EntityRef {
        self.inner.root()
    }

    fn is_root(&self) -> bool {
        self.inner.is_root()
    }

    fn volume(&self) -> EntityRef {
        self.inner.volume()
    }
}

impl EntityContent for ProxyEntity {
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

impl EntityMutation for ProxyEntity {
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

impl EntityListing for ProxyEntity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        self.inner.ls()
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        self.inner.ls_filtered(filter)
    }
}

impl EntitySpace for ProxyEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        self.inner.free_space()
    }

    fn total_space(&self) -> Result<u64, FileError> {
        self.inner.total_space()
    }
}
