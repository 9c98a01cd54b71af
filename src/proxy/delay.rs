//! Latency-injecting decorator for exercising slow backends in tests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityRef, FileEntity, FileError,
    FileOperation, FilePermissions, InputStream, Location, OperationCategory, OutputStream,
    RandomAccessInput, RandomAccessOutput,
};

/// Per-category delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayConfig {
    /// Attribute getters and setters.
    pub attributes: Duration,
    /// Parent, root and volume lookups.
    pub navigation: Duration,
    /// Opening a stream.
    pub content: Duration,
    /// mkdir, delete, rename, remote copy.
    pub mutation: Duration,
    /// Listing.
    pub listing: Duration,
    /// Space queries.
    pub space: Duration,
}

impl DelayConfig {
    /// The same delay everywhere.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            attributes: delay,
            navigation: delay,
            content: delay,
            mutation: delay,
            listing: delay,
            space: delay,
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    /// Roughly a remote share over a slow link.
    pub fn slow_network() -> Self {
        Self {
            attributes: Duration::from_millis(30),
            navigation: Duration::from_millis(30),
            content: Duration::from_millis(100),
            mutation: Duration::from_millis(100),
            listing: Duration::from_millis(500),
            space: Duration::from_millis(50),
        }
    }

    /// The delay for one category.
    pub fn delay_for(&self, category: OperationCategory) -> Duration {
        match category {
            OperationCategory::Attributes => self.attributes,
            OperationCategory::Navigation => self.navigation,
            OperationCategory::Content => self.content,
            OperationCategory::Mutation => self.mutation,
            OperationCategory::Listing => self.listing,
            OperationCategory::Space => self.space,
        }
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self::none()
    }
}

/// Call counters collected by a [`DelayedEntity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayMetrics {
    /// Calls per operation.
    pub calls: std::collections::BTreeMap<FileOperation, usize>,
    /// Total time spent sleeping.
    pub total_delay: Duration,
}

impl DelayMetrics {
    /// Calls of one operation.
    pub fn calls_of(&self, operation: FileOperation) -> usize {
        self.calls.get(&operation).copied().unwrap_or(0)
    }

    /// Calls of every operation.
    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }

    /// Reset to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Sleeps before every operation, then forwards it.
///
/// Metrics are shared between clones of the handle returned by
/// [`metrics`](Self::metrics), so a test can keep it after handing the
/// entity away.
pub struct DelayedEntity {
    inner: EntityRef,
    config: DelayConfig,
    metrics: Arc<Mutex<DelayMetrics>>,
}

impl DelayedEntity {
    /// Wrap `inner`.
    pub fn new(inner: EntityRef, config: DelayConfig) -> Self {
        Self::with_metrics(inner, config, Arc::default())
    }

    /// Wrap `inner`, recording into existing metrics.
    pub fn with_metrics(inner: EntityRef, config: DelayConfig, metrics: Arc<Mutex<DelayMetrics>>) -> Self {
        Self {
            inner,
            config,
            metrics,
        }
    }

    /// The shared metrics.
    pub fn metrics(&self) -> Arc<Mutex<DelayMetrics>> {
        Arc::clone(&self.metrics)
    }

    /// The wrapped entity.
    pub fn inner(&self) -> &EntityRef {
        &self.inner
    }

    fn delay(&self, operation: FileOperation) {
        let delay = self.config.delay_for(operation.category());
        {
            let mut metrics = self.metrics.lock();
            *metrics.calls.entry(operation).or_insert(0) += 1;
            metrics.total_delay += delay;
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    /// Children share this wrapper's config and metrics.
    fn wrap_children(&self, children: Vec<EntityRef>) -> Vec<EntityRef> {
        children
            .into_iter()
            .map(|child| {
                Arc::new(DelayedEntity::with_metrics(
                    child,
                    self.config.clone(),
                    Arc::clone(&self.metrics),
                )) as EntityRef
            })
            .collect()
    }
}

impl EntityCore for DelayedEntity {
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

impl EntityAttributes for DelayedEntity {
    fn exists(&self) -> bool {
        self.delay(FileOperation::Exists);
        self.inner.exists()
    }

    fn is_directory(&self) -> bool {
        self.delay(FileOperation::IsDirectory);
        self.inner.is_directory()
    }

    fn is_symlink(&self) -> bool {
        self.delay(FileOperation::IsSymlink);
        self.inner.is_symlink()
    }

    fn is_hidden(&self) -> bool {
        self.delay(FileOperation::IsHidden);
        self.inner.is_hidden()
    }

    fn is_system(&self) -> bool {
        self.delay(FileOperation::IsSystem);
        self.inner.is_system()
    }

    fn size(&self) -> Option<u64> {
        self.delay(FileOperation::Size);
        self.inner.size()
    }

    fn date(&self) -> Option<SystemTime> {
        self.delay(FileOperation::Date);
        self.inner.date()
    }

    fn change_date(&self, date: SystemTime) -> Result<(), FileError> {
        self.delay(FileOperation::ChangeDate);
        self.inner.change_date(date)
    }

    fn permissions(&self) -> FilePermissions {
        self.delay(FileOperation::Permissions);
        self.inner.permissions()
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        self.delay(FileOperation::ChangeablePermissions);
        self.inner.changeable_permissions()
    }

    fn change_permissions(&self, bits: u16) -> Result<(), FileError> {
        self.delay(FileOperation::ChangePermissions);
        self.inner.change_permissions(bits)
    }

    fn owner(&self) -> Option<String> {
        self.delay(FileOperation::Owner);
        self.inner.owner()
    }

    fn group(&self) -> Option<String> {
        self.delay(FileOperation::Group);
        self.inner.group()
    }

    fn can_get_owner(&self) -> bool {
        self.delay(FileOperation::CanGetOwner);
        self.inner.can_get_owner()
    }

    fn can_get_group(&self) -> bool {
        self.delay(FileOperation::CanGetGroup);
        self.inner.can_get_group()
    }
}

impl EntityNavigation for DelayedEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.delay(FileOperation::Parent);
        self.inner.parent()
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.delay(FileOperation::SetParent);
        self.inner.set_parent(parent)
    }

    fn root(&self) -> EntityRef {
        self.delay(FileOperation::Root);
        self.inner.root()
    }

    fn is_root(&self) -> bool {
        self.delay(FileOperation::IsRoot);
        self.inner.is_root()
    }

    fn volume(&self) -> EntityRef {
        self.delay(FileOperation::Volume);
        self.inner.volume()
    }
}

impl EntityContent for DelayedEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        self.delay(FileOperation::ReadFile);
        self.inner.input_stream()
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        self.delay(FileOperation::WriteFile);
        self.inner.output_stream()
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        self.delay(FileOperation::AppendFile);
        self.inner.append_stream()
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        self.delay(FileOperation::RandomReadFile);
        self.inner.random_access_input()
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        self.delay(FileOperation::RandomWriteFile);
        self.inner.random_access_output()
    }
}

impl EntityMutation for DelayedEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        self.delay(FileOperation::CreateDirectory);
        self.inner.mkdir()
    }

    fn delete(&self) -> Result<(), FileError> {
        self.delay(FileOperation::Delete);
        self.inner.delete()
    }

    fn rename_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        self.delay(FileOperation::Rename);
        self.inner.rename_to(destination)
    }

    fn copy_remotely_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        self.delay(FileOperation::CopyRemotely);
        self.inner.copy_remotely_to(destination)
    }
}

impl EntityListing for DelayedEntity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        self.delay(FileOperation::ListChildren);
        Ok(self.wrap_children(self.inner.ls()?))
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        self.delay(FileOperation::ListChildrenFiltered);
        Ok(self.wrap_children(self.inner.ls_filtered(filter)?))
    }
}

impl EntitySpace for DelayedEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        self.delay(FileOperation::FreeSpace);
        self.inner.free_space()
    }

    fn total_space(&self) -> Result<u64, FileError> {
        self.delay(FileOperation::TotalSpace);
        self.inner.total_space()
    }
}
