//! Virtualization management hierarchy exposed as a file tree.
//!
//! Nothing here is a real directory. Each level is a management object and
//! listing one level performs one enumeration call:
//!
//! ```text
//! virt://host/                      root     → domains
//! virt://host/domain                domain   → storage pools
//! virt://host/domain/pool           pool     → disks
//! virt://host/domain/pool/disk.img  disk     (readable, deletable)
//! ```
//!
//! Paths are synthetic: parent path, `/`, child identifier. Only disks have
//! content and only disks can be deleted; every other mutation is
//! [`FileError::Unsupported`].
//!
//! The management protocol is a strict request/response exchange on one
//! channel, so a [`VirtConnection`] serializes every call on a mutex. A
//! call that finds the session dropped reconnects once and is retried once.

use std::io::{self, Read};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::attrs::{AttributeSource, SyncedAttributes};
use crate::common::{ParentSlot, ls_filtered_via};
use crate::connection::{Connection, ConnectionFactory, ConnectionPool};
use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityProvider, EntityRef, FileAttributes,
    FileEntity, FileError, FileOperation, FilePermissions, InputStream, Location, NativeHandle,
    OutputStream, RandomAccessInput, RandomAccessOutput, Realm, VfsConfig,
};

/// The URL scheme of this backend.
pub const VIRT_SCHEME: &str = "virt";

/// A storage volume (disk image) in a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtDisk {
    /// Volume name, unique within its pool.
    pub name: String,
    /// Logical size in bytes.
    pub capacity: u64,
    /// Last modification, if reported.
    pub modified: Option<SystemTime>,
}

/// Failure reported by a [`VirtManager`].
#[derive(Debug, thiserror::Error)]
pub enum VirtError {
    /// The domain, pool or disk does not exist.
    #[error("no such object: {0}")]
    NoSuchObject(String),
    /// The credentials were rejected.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// The credentials lack permission.
    #[error("permission denied")]
    PermissionDenied,
    /// The session dropped.
    #[error("connection lost")]
    ConnectionLost,
    /// Any other management API failure.
    #[error("management error: {0}")]
    Api(String),
}

impl VirtError {
    /// Translate into the crate taxonomy.
    pub fn into_file_error(self, operation: &'static str, location: &Location) -> FileError {
        match self {
            VirtError::NoSuchObject(_) => FileError::not_found(location),
            VirtError::AuthenticationFailed => FileError::AuthenticationRequired {
                realm: location.realm(),
            },
            VirtError::PermissionDenied => FileError::access_denied(location),
            other => FileError::io(operation, location, io::Error::other(other)),
        }
    }
}

/// One management session. Calls are strictly sequential, hence `&mut`.
pub trait VirtManager: Send {
    /// Names of the management domains.
    fn list_domains(&mut self) -> Result<Vec<String>, VirtError>;
    /// Names of the storage pools of `domain`.
    fn list_pools(&mut self, domain: &str) -> Result<Vec<String>, VirtError>;
    /// Disks of one pool.
    fn list_disks(&mut self, domain: &str, pool: &str) -> Result<Vec<VirtDisk>, VirtError>;
    /// One disk, `None` if it does not exist.
    fn disk_info(&mut self, domain: &str, pool: &str, disk: &str) -> Result<Option<VirtDisk>, VirtError>;
    /// Stream a disk's content.
    fn open_disk(&mut self, domain: &str, pool: &str, disk: &str) -> Result<Box<dyn Read + Send>, VirtError>;
    /// Delete a disk.
    fn delete_disk(&mut self, domain: &str, pool: &str, disk: &str) -> Result<(), VirtError>;
    /// Ping the server so it does not drop an idle session.
    fn keep_alive(&mut self) -> Result<(), VirtError>;
    /// Whether the session is still open.
    fn is_alive(&self) -> bool;
}

/// Opens management sessions.
pub trait VirtConnector: Send + Sync + 'static {
    /// Open and authenticate a session for `realm`.
    fn connect(&self, realm: &Realm) -> Result<Box<dyn VirtManager>, VirtError>;
}

/// Pooled management session.
pub struct VirtConnection {
    realm: Realm,
    connector: Arc<dyn VirtConnector>,
    session: Mutex<Option<Box<dyn VirtManager>>>,
}

impl VirtConnection {
    /// Run one exchange with exclusive use of the session.
    pub fn exchange<T>(
        &self,
        f: impl FnOnce(&mut dyn VirtManager) -> Result<T, VirtError>,
    ) -> Result<T, VirtError> {
        let mut session = self.session.lock();
        match session.as_mut() {
            Some(manager) => f(&mut **manager),
            None => Err(VirtError::ConnectionLost),
        }
    }
}

impl Connection for VirtConnection {
    fn connect(&self) -> Result<(), FileError> {
        let manager = self
            .connector
            .connect(&self.realm)
            .map_err(|e| e.into_file_error("connect", &self.realm.root_location()))?;
        *self.session.lock() = Some(manager);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|manager| manager.is_alive())
    }

    fn disconnect(&self) {
        self.session.lock().take();
    }

    fn keep_alive(&self) -> Result<(), FileError> {
        self.exchange(|manager| manager.keep_alive())
            .map_err(|e| e.into_file_error("keep_alive", &self.realm.root_location()))
    }
}

/// Creates [`VirtConnection`]s for the pool.
pub struct VirtConnectionFactory {
    connector: Arc<dyn VirtConnector>,
}

impl VirtConnectionFactory {
    /// Factory over `connector`.
    pub fn new(connector: Arc<dyn VirtConnector>) -> Self {
        Self { connector }
    }
}

impl ConnectionFactory for VirtConnectionFactory {
    type Connection = VirtConnection;

    fn create(&self, realm: &Realm) -> Result<VirtConnection, FileError> {
        Ok(VirtConnection {
            realm: realm.clone(),
            connector: Arc::clone(&self.connector),
            session: Mutex::new(None),
        })
    }
}

/// Session pool of the virtualization backend.
pub type VirtPool = ConnectionPool<VirtConnectionFactory>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum VirtNode {
    Root,
    Domain {
        domain: String,
    },
    Pool {
        domain: String,
        pool: String,
    },
    Disk {
        domain: String,
        pool: String,
        disk: String,
    },
}

impl VirtNode {
    fn from_location(location: &Location) -> Result<VirtNode, FileError> {
        let segments: Vec<&str> = location.segments().collect();
        let node = match segments.as_slice() {
            [] => VirtNode::Root,
            [domain] => VirtNode::Domain {
                domain: domain.to_string(),
            },
            [domain, pool] => VirtNode::Pool {
                domain: domain.to_string(),
                pool: pool.to_string(),
            },
            [domain, pool, disk] => VirtNode::Disk {
                domain: domain.to_string(),
                pool: pool.to_string(),
                disk: disk.to_string(),
            },
            _ => {
                return Err(FileError::InvalidLocation {
                    input: location.to_string(),
                    reason: "deeper than domain/pool/disk".to_string(),
                });
            }
        };
        Ok(node)
    }
}

fn level_attributes() -> FileAttributes {
    FileAttributes::directory(None).with_permissions(FilePermissions::new(0o500, 0o700))
}

fn disk_attributes(disk: &VirtDisk) -> FileAttributes {
    FileAttributes::file(disk.capacity, disk.modified).with_permissions(FilePermissions::new(0o600, 0o700))
}

/// Run `f` on a pooled session for `location`'s realm, reconnecting and
/// retrying once if the session turns out to be gone.
fn with_manager<T>(
    pool: &VirtPool,
    location: &Location,
    operation: &'static str,
    mut f: impl FnMut(&mut dyn VirtManager) -> Result<T, VirtError>,
) -> Result<T, FileError> {
    let connection = pool.acquire(location, false)?;
    connection.check_connection()?;
    let result = match connection.exchange(&mut f) {
        Err(VirtError::ConnectionLost) => {
            debug!(realm = %connection.realm(), operation, "session lost mid-exchange, reconnecting once");
            connection.disconnect();
            connection.check_connection()?;
            connection.exchange(&mut f)
        }
        other => other,
    };
    result.map_err(|e| e.into_file_error(operation, location))
}

struct VirtProbe {
    location: Location,
    node: VirtNode,
    pool: VirtPool,
}

impl AttributeSource for VirtProbe {
    fn fetch_attributes(&self) -> Result<FileAttributes, FileError> {
        trace!(location = %self.location, "virt attribute probe");
        let present = |found: bool| {
            if found {
                level_attributes()
            } else {
                FileAttributes::missing()
            }
        };
        match &self.node {
            VirtNode::Root => Ok(level_attributes()),
            VirtNode::Domain { domain } => with_manager(&self.pool, &self.location, "list_domains", |m| {
                Ok(present(m.list_domains()?.iter().any(|d| d == domain)))
            }),
            VirtNode::Pool { domain, pool } => with_manager(&self.pool, &self.location, "list_pools", |m| {
                match m.list_pools(domain) {
                    Ok(pools) => Ok(present(pools.iter().any(|p| p == pool))),
                    Err(VirtError::NoSuchObject(_)) => Ok(FileAttributes::missing()),
                    Err(other) => Err(other),
                }
            }),
            VirtNode::Disk { domain, pool, disk } => with_manager(&self.pool, &self.location, "disk_info", |m| {
                match m.disk_info(domain, pool, disk) {
                    Ok(info) => Ok(info.as_ref().map_or_else(FileAttributes::missing, disk_attributes)),
                    Err(VirtError::NoSuchObject(_)) => Ok(FileAttributes::missing()),
                    Err(other) => Err(other),
                }
            }),
        }
    }
}

/// A domain, pool or disk in the management hierarchy.
pub struct VirtEntity {
    attributes: SyncedAttributes<VirtProbe>,
    parent: ParentSlot,
    this: Weak<VirtEntity>,
}

impl VirtEntity {
    /// Entity at a `virt` location.
    pub fn from_location(location: Location, pool: VirtPool, ttl: Duration) -> Result<Arc<VirtEntity>, FileError> {
        if location.scheme() != VIRT_SCHEME {
            return Err(FileError::InvalidLocation {
                input: location.to_string(),
                reason: "not a virt location".to_string(),
            });
        }
        let node = VirtNode::from_location(&location)?;
        Ok(Self::build(location, node, pool, ttl, None))
    }

    fn build(
        location: Location,
        node: VirtNode,
        pool: VirtPool,
        ttl: Duration,
        known: Option<FileAttributes>,
    ) -> Arc<VirtEntity> {
        let probe = VirtProbe { location, node, pool };
        let attributes = match known {
            Some(known) => SyncedAttributes::prepopulated(probe, ttl, known),
            None => SyncedAttributes::new(probe, ttl, false),
        };
        Arc::new_cyclic(|this| VirtEntity {
            attributes,
            parent: ParentSlot::new(),
            this: this.clone(),
        })
    }

    fn probe(&self) -> &VirtProbe {
        self.attributes.source()
    }

    fn node(&self) -> &VirtNode {
        &self.probe().node
    }

    fn pool(&self) -> &VirtPool {
        &self.probe().pool
    }

    fn related(&self, location: Location, known: Option<FileAttributes>) -> Option<Arc<VirtEntity>> {
        let node = VirtNode::from_location(&location).ok()?;
        Some(Self::build(location, node, self.pool().clone(), self.attributes.ttl(), known))
    }

    /// Child entities of a listing. A name that is not a single path
    /// segment fails the whole listing.
    fn children(&self, named: Vec<(String, FileAttributes)>) -> Result<Vec<EntityRef>, FileError> {
        let this: Option<EntityRef> = self.this.upgrade().map(|this| this as EntityRef);
        named
            .into_iter()
            .map(|(name, known)| {
                if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                    return Err(FileError::protocol(
                        "ls",
                        self.location(),
                        format!("manager reported an unusable name {name:?}"),
                    ));
                }
                let location = self.location().child(&name);
                let node = VirtNode::from_location(&location)?;
                let child = Self::build(location, node, self.pool().clone(), self.attributes.ttl(), Some(known));
                child.parent.set(this.clone());
                Ok(child as EntityRef)
            })
            .collect()
    }

    fn call<T>(
        &self,
        operation: &'static str,
        f: impl FnMut(&mut dyn VirtManager) -> Result<T, VirtError>,
    ) -> Result<T, FileError> {
        with_manager(self.pool(), self.location(), operation, f)
    }

    fn unsupported<T>(operation: FileOperation) -> Result<T, FileError> {
        Err(FileError::unsupported(operation))
    }
}

impl EntityCore for VirtEntity {
    fn location(&self) -> &Location {
        &self.probe().location
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Virt
    }

    fn supports(&self, operation: FileOperation) -> bool {
        use FileOperation::*;
        match operation {
            ReadFile | Delete => matches!(self.node(), VirtNode::Disk { .. }),
            ChangeDate | ChangePermissions | Owner | Group | WriteFile | AppendFile | RandomReadFile
            | RandomWriteFile | CreateDirectory | Rename | CopyRemotely | FreeSpace | TotalSpace => false,
            _ => true,
        }
    }
}

impl EntityAttributes for VirtEntity {
    fn exists(&self) -> bool {
        self.attributes.with(|a| a.exists)
    }

    fn is_directory(&self) -> bool {
        self.attributes.with(|a| a.is_directory)
    }

    fn is_symlink(&self) -> bool {
        false
    }

    fn is_hidden(&self) -> bool {
        false
    }

    fn is_system(&self) -> bool {
        false
    }

    fn size(&self) -> Option<u64> {
        self.attributes.with(|a| a.size)
    }

    fn date(&self) -> Option<SystemTime> {
        self.attributes.with(|a| a.date)
    }

    fn change_date(&self, _date: SystemTime) -> Result<(), FileError> {
        Self::unsupported(FileOperation::ChangeDate)
    }

    fn permissions(&self) -> FilePermissions {
        self.attributes.with(|a| a.permissions)
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        ChangeablePermissions::NONE
    }

    fn change_permissions(&self, _permissions: u16) -> Result<(), FileError> {
        Self::unsupported(FileOperation::ChangePermissions)
    }

    fn owner(&self) -> Option<String> {
        None
    }

    fn group(&self) -> Option<String> {
        None
    }

    fn can_get_owner(&self) -> bool {
        false
    }

    fn can_get_group(&self) -> bool {
        false
    }
}

impl EntityNavigation for VirtEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.parent.get_or_resolve(|| {
            let parent = self.location().parent()?;
            Some(self.related(parent, Some(level_attributes()))? as EntityRef)
        })
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.parent.set(parent);
    }

    fn root(&self) -> EntityRef {
        if let (VirtNode::Root, Some(this)) = (self.node(), self.this.upgrade()) {
            return this;
        }
        let location = self.location().with_path("/");
        Self::build(
            location,
            VirtNode::Root,
            self.pool().clone(),
            self.attributes.ttl(),
            Some(level_attributes()),
        )
    }

    fn is_root(&self) -> bool {
        matches!(self.node(), VirtNode::Root)
    }

    fn volume(&self) -> EntityRef {
        self.root()
    }
}

impl EntityContent for VirtEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        let VirtNode::Disk { domain, pool, disk } = self.node() else {
            return Self::unsupported(FileOperation::ReadFile);
        };
        self.call("open_disk", |m| m.open_disk(domain, pool, disk))
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        Self::unsupported(FileOperation::WriteFile)
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        Self::unsupported(FileOperation::AppendFile)
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        Self::unsupported(FileOperation::RandomReadFile)
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        Self::unsupported(FileOperation::RandomWriteFile)
    }
}

impl EntityMutation for VirtEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        Self::unsupported(FileOperation::CreateDirectory)
    }

    /// Disks only. The root, domains and pools reject deletion.
    fn delete(&self) -> Result<(), FileError> {
        let VirtNode::Disk { domain, pool, disk } = self.node() else {
            return Self::unsupported(FileOperation::Delete);
        };
        self.call("delete_disk", |m| m.delete_disk(domain, pool, disk))?;
        debug!(location = %self.location(), "deleted disk");
        self.attributes.set(FileAttributes::missing());
        Ok(())
    }

    fn rename_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        Self::unsupported(FileOperation::Rename)
    }

    fn copy_remotely_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        Self::unsupported(FileOperation::CopyRemotely)
    }
}

impl EntityListing for VirtEntity {
    /// One enumeration call, one level down.
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        let named: Vec<(String, FileAttributes)> = match self.node() {
            VirtNode::Root => self
                .call("list_domains", |m| m.list_domains())?
                .into_iter()
                .map(|domain| (domain, level_attributes()))
                .collect(),
            VirtNode::Domain { domain } => self
                .call("list_pools", |m| m.list_pools(domain))?
                .into_iter()
                .map(|pool| (pool, level_attributes()))
                .collect(),
            VirtNode::Pool { domain, pool } => self
                .call("list_disks", |m| m.list_disks(domain, pool))?
                .iter()
                .map(|disk| (disk.name.clone(), disk_attributes(disk)))
                .collect(),
            VirtNode::Disk { .. } => {
                return Err(FileError::NotADirectory {
                    location: self.location().to_string(),
                });
            }
        };
        self.children(named)
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        ls_filtered_via(self, filter)
    }
}

impl EntitySpace for VirtEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        Self::unsupported(FileOperation::FreeSpace)
    }

    fn total_space(&self) -> Result<u64, FileError> {
        Self::unsupported(FileOperation::TotalSpace)
    }
}

/// [`EntityProvider`] for the `virt` scheme.
pub struct VirtProvider {
    pool: VirtPool,
    ttl: Duration,
}

impl VirtProvider {
    /// Provider with its own session pool.
    pub fn new(connector: Arc<dyn VirtConnector>, config: &VfsConfig) -> Self {
        Self {
            pool: ConnectionPool::new(VirtConnectionFactory::new(connector), config.connection.clone()),
            ttl: config.attribute_ttl,
        }
    }

    /// The session pool, for maintenance and event subscription.
    pub fn pool(&self) -> &VirtPool {
        &self.pool
    }
}

impl EntityProvider for VirtProvider {
    fn create(&self, location: Location, _handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        Ok(VirtEntity::from_location(location, self.pool.clone(), self.ttl)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_depth_is_bounded() {
        let node = |s: &str| VirtNode::from_location(&Location::parse(s).unwrap());
        assert_eq!(node("virt://h/").unwrap(), VirtNode::Root);
        assert!(matches!(node("virt://h/d/p").unwrap(), VirtNode::Pool { .. }));
        assert!(matches!(node("virt://h/d/p/x/y"), Err(FileError::InvalidLocation { .. })));
    }

    #[test]
    fn auth_failure_carries_realm() {
        let location = Location::parse("virt://admin:pw@h/").unwrap();
        let err = VirtError::AuthenticationFailed.into_file_error("connect", &location);
        assert!(err.is_user_recoverable());
        assert_eq!(err.realm(), Some(&location.realm()));
    }
}
