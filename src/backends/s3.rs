//! Object-storage backend.
//!
//! The `s3://host[:port]/bucket/key` namespace is three-levelled:
//!
//! | Path | Node | Listing |
//! |------|------|---------|
//! | `/` | service root | buckets |
//! | `/bucket` | bucket | top-level objects and common prefixes |
//! | `/bucket/a/b` | object or prefix | objects and prefixes under `a/b/` |
//!
//! Directories below a bucket are either explicit `key/` marker objects or
//! implicit common prefixes. Object content is buffered in memory and
//! uploaded on flush (or on drop, where a failure can only be logged).
//!
//! The REST client is out of scope: an [`S3Connector`] opens an
//! [`S3Client`] per realm, and sessions are pooled through a
//! [`ConnectionPool`].

use std::io::{self, Read, Write};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::attrs::{AttributeSource, SyncedAttributes};
use crate::common::{ParentSlot, ensure_same_volume, ls_filtered_via};
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

const DELIMITER: &str = "/";

/// Object summary, as returned by listings and `HEAD`.
///
/// Also accepted as a [`NativeHandle`] so a child created from a listing
/// starts with warm attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    /// Full key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification.
    pub last_modified: Option<SystemTime>,
    /// Owner display name.
    pub owner: Option<String>,
}

/// Bucket summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation date.
    pub created: Option<SystemTime>,
    /// Owner display name.
    pub owner: Option<String>,
}

/// One page of a delimited object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Listing {
    /// Objects directly under the prefix.
    pub objects: Vec<S3Object>,
    /// Sub-prefixes, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
}

/// Failure reported by an [`S3Client`].
#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    /// The bucket does not exist.
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),
    /// The key does not exist.
    #[error("no such key: {0}")]
    NoSuchKey(String),
    /// The bucket or key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The bucket still holds objects.
    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),
    /// The credentials lack permission.
    #[error("access denied")]
    AccessDenied,
    /// The credentials were rejected or are missing.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Any other service or transport failure.
    #[error("service error: {0}")]
    Service(String),
}

impl S3Error {
    /// Translate into the crate taxonomy.
    pub fn into_file_error(self, operation: &'static str, location: &Location) -> FileError {
        match self {
            S3Error::NoSuchBucket(_) | S3Error::NoSuchKey(_) => FileError::not_found(location),
            S3Error::AlreadyExists(_) => FileError::AlreadyExists {
                location: location.to_string(),
            },
            S3Error::AccessDenied => FileError::access_denied(location),
            S3Error::InvalidCredentials => FileError::AuthenticationRequired {
                realm: location.realm(),
            },
            other => FileError::io(operation, location, io::Error::other(other)),
        }
    }
}

/// Object-storage operations used by the backend.
pub trait S3Client: Send + Sync {
    /// All buckets visible to the credentials.
    fn list_buckets(&self) -> Result<Vec<S3Bucket>, S3Error>;
    /// Bucket summary, `None` if it does not exist.
    fn head_bucket(&self, bucket: &str) -> Result<Option<S3Bucket>, S3Error>;
    /// Create a bucket.
    fn create_bucket(&self, bucket: &str) -> Result<(), S3Error>;
    /// Delete an empty bucket.
    fn delete_bucket(&self, bucket: &str) -> Result<(), S3Error>;
    /// Objects and common prefixes under `prefix`, split at `delimiter`.
    fn list_objects(&self, bucket: &str, prefix: &str, delimiter: Option<&str>) -> Result<S3Listing, S3Error>;
    /// Object summary, `None` if it does not exist.
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<S3Object>, S3Error>;
    /// Object content.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + Send>, S3Error>;
    /// Create or replace an object.
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), S3Error>;
    /// Server-side copy.
    fn copy_object(&self, bucket: &str, key: &str, to_bucket: &str, to_key: &str) -> Result<(), S3Error>;
    /// Delete an object. Deleting a missing key succeeds.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3Error>;
}

/// Opens authenticated clients.
pub trait S3Connector: Send + Sync + 'static {
    /// Open a client for `realm`, using its credentials.
    fn connect(&self, realm: &Realm) -> Result<Arc<dyn S3Client>, S3Error>;
}

/// Pooled object-storage session.
pub struct S3Connection {
    realm: Realm,
    connector: Arc<dyn S3Connector>,
    client: RwLock<Option<Arc<dyn S3Client>>>,
}

impl S3Connection {
    /// The connected client.
    pub fn client(&self) -> Result<Arc<dyn S3Client>, FileError> {
        self.client.read().clone().ok_or_else(|| {
            FileError::io(
                "s3",
                &self.realm,
                io::Error::new(io::ErrorKind::NotConnected, "session not connected"),
            )
        })
    }
}

impl Connection for S3Connection {
    fn connect(&self) -> Result<(), FileError> {
        let client = self
            .connector
            .connect(&self.realm)
            .map_err(|e| e.into_file_error("connect", &self.realm.root_location()))?;
        *self.client.write() = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.read().is_some()
    }

    fn disconnect(&self) {
        self.client.write().take();
    }
}

/// Creates [`S3Connection`]s for the pool.
pub struct S3ConnectionFactory {
    connector: Arc<dyn S3Connector>,
}

impl S3ConnectionFactory {
    /// Factory over `connector`.
    pub fn new(connector: Arc<dyn S3Connector>) -> Self {
        Self { connector }
    }
}

impl ConnectionFactory for S3ConnectionFactory {
    type Connection = S3Connection;

    fn create(&self, realm: &Realm) -> Result<S3Connection, FileError> {
        Ok(S3Connection {
            realm: realm.clone(),
            connector: Arc::clone(&self.connector),
            client: RwLock::new(None),
        })
    }
}

/// Session pool of the object-storage backend.
pub type S3Pool = ConnectionPool<S3ConnectionFactory>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum S3Node {
    Root,
    Bucket(String),
    Object { bucket: String, key: String },
}

impl S3Node {
    fn from_location(location: &Location) -> S3Node {
        let mut segments = location.segments();
        match segments.next() {
            None => S3Node::Root,
            Some(bucket) => {
                let key: Vec<&str> = segments.collect();
                if key.is_empty() {
                    S3Node::Bucket(bucket.to_string())
                } else {
                    S3Node::Object {
                        bucket: bucket.to_string(),
                        key: key.join(DELIMITER),
                    }
                }
            }
        }
    }

    /// Listing prefix of a directory-like node.
    fn prefix(&self) -> String {
        match self {
            S3Node::Object { key, .. } => format!("{key}{DELIMITER}"),
            _ => String::new(),
        }
    }
}

fn object_attributes(object: &S3Object) -> FileAttributes {
    FileAttributes {
        owner: object.owner.clone(),
        ..FileAttributes::file(object.size, object.last_modified)
    }
    .with_permissions(FilePermissions::new(0o600, 0o700))
}

fn directory_attributes(date: Option<SystemTime>, owner: Option<String>) -> FileAttributes {
    FileAttributes {
        owner,
        ..FileAttributes::directory(date)
    }
    .with_permissions(FilePermissions::new(0o700, 0o700))
}

/// Run `f` on a pooled client for `location`'s realm.
fn with_client<T>(
    pool: &S3Pool,
    location: &Location,
    operation: &'static str,
    f: impl FnOnce(&dyn S3Client) -> Result<T, S3Error>,
) -> Result<T, FileError> {
    let connection = pool.acquire(location, false)?;
    connection.check_connection()?;
    let client = connection.client()?;
    f(client.as_ref()).map_err(|e| e.into_file_error(operation, location))
}

struct S3Probe {
    location: Location,
    node: S3Node,
    pool: S3Pool,
}

impl AttributeSource for S3Probe {
    fn fetch_attributes(&self) -> Result<FileAttributes, FileError> {
        trace!(location = %self.location, "S3 attribute probe");
        match &self.node {
            S3Node::Root => Ok(directory_attributes(None, None)),
            S3Node::Bucket(bucket) => with_client(&self.pool, &self.location, "head_bucket", |client| {
                Ok(client
                    .head_bucket(bucket)?
                    .map_or_else(FileAttributes::missing, |b| directory_attributes(b.created, b.owner)))
            }),
            S3Node::Object { bucket, key } => with_client(&self.pool, &self.location, "head_object", |client| {
                if let Some(object) = client.head_object(bucket, key)? {
                    return Ok(object_attributes(&object));
                }
                let prefix = format!("{key}{DELIMITER}");
                if let Some(marker) = client.head_object(bucket, &prefix)? {
                    return Ok(directory_attributes(marker.last_modified, marker.owner));
                }
                let listing = client.list_objects(bucket, &prefix, Some(DELIMITER))?;
                if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
                    Ok(FileAttributes::missing())
                } else {
                    Ok(directory_attributes(None, None))
                }
            }),
        }
    }
}

/// A bucket, object or prefix in object storage.
pub struct S3Entity {
    attributes: SyncedAttributes<S3Probe>,
    parent: ParentSlot,
    this: Weak<S3Entity>,
}

impl S3Entity {
    /// Entity at an `s3` location. A [`NativeHandle`] holding an
    /// [`S3Object`] pre-populates the attributes.
    pub fn from_location(
        location: Location,
        pool: S3Pool,
        ttl: Duration,
        handle: Option<&NativeHandle>,
    ) -> Result<Arc<S3Entity>, FileError> {
        if location.scheme() != "s3" {
            return Err(FileError::InvalidLocation {
                input: location.to_string(),
                reason: "not an s3 location".to_string(),
            });
        }
        let known = handle
            .and_then(|handle| handle.downcast_ref::<S3Object>())
            .map(object_attributes);
        Ok(Self::build(location, pool, ttl, known))
    }

    fn build(location: Location, pool: S3Pool, ttl: Duration, known: Option<FileAttributes>) -> Arc<S3Entity> {
        let probe = S3Probe {
            node: S3Node::from_location(&location),
            location,
            pool,
        };
        let attributes = match known {
            Some(known) => SyncedAttributes::prepopulated(probe, ttl, known),
            None => SyncedAttributes::new(probe, ttl, false),
        };
        Arc::new_cyclic(|this| S3Entity {
            attributes,
            parent: ParentSlot::new(),
            this: this.clone(),
        })
    }

    fn probe(&self) -> &S3Probe {
        self.attributes.source()
    }

    fn node(&self) -> &S3Node {
        &self.probe().node
    }

    fn pool(&self) -> &S3Pool {
        &self.probe().pool
    }

    /// Number of attribute probes issued so far.
    pub fn probe_count(&self) -> u64 {
        self.attributes.refresh_count()
    }

    fn related(&self, location: Location, known: Option<FileAttributes>) -> Arc<S3Entity> {
        Self::build(location, self.pool().clone(), self.attributes.ttl(), known)
    }

    fn child_entity(&self, name: &str, known: FileAttributes) -> EntityRef {
        let child = self.related(self.location().child(name), Some(known));
        child.parent.set(self.this.upgrade().map(|this| this as EntityRef));
        child
    }

    fn client_call<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&dyn S3Client) -> Result<T, S3Error>,
    ) -> Result<T, FileError> {
        with_client(self.pool(), self.location(), operation, f)
    }

    fn object_key(&self, operation: FileOperation) -> Result<(&str, &str), FileError> {
        match self.node() {
            S3Node::Object { bucket, key } => Ok((bucket, key)),
            _ => Err(FileError::unsupported(operation)),
        }
    }

    fn upload(&self, initial: Vec<u8>) -> Result<OutputStream, FileError> {
        let (bucket, key) = self.object_key(FileOperation::WriteFile)?;
        let connection = self.pool().acquire(self.location(), false)?;
        connection.check_connection()?;
        Ok(Box::new(S3Upload {
            client: connection.client()?,
            bucket: bucket.to_string(),
            key: key.to_string(),
            location: self.location().clone(),
            buffer: initial,
            dirty: true,
            entity: self.this.clone(),
        }))
    }

    /// Prefix listing of this directory, marker object excluded.
    fn list_prefix(&self) -> Result<(String, S3Listing), FileError> {
        let (bucket, prefix) = match self.node() {
            S3Node::Root => return Err(FileError::unsupported(FileOperation::ListChildren)),
            S3Node::Bucket(bucket) => (bucket.clone(), String::new()),
            S3Node::Object { bucket, .. } => (bucket.clone(), self.node().prefix()),
        };
        let mut listing = self.client_call("list_objects", |client| {
            client.list_objects(&bucket, &prefix, Some(DELIMITER))
        })?;
        listing.objects.retain(|object| object.key != prefix);
        Ok((prefix, listing))
    }
}

impl EntityCore for S3Entity {
    fn location(&self) -> &Location {
        &self.probe().location
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::S3
    }

    fn supports(&self, operation: FileOperation) -> bool {
        use FileOperation::*;
        match operation {
            ChangeDate | ChangePermissions | Group | RandomReadFile | RandomWriteFile | FreeSpace | TotalSpace => false,
            ReadFile | WriteFile | AppendFile | Rename | CopyRemotely => {
                matches!(self.node(), S3Node::Object { .. })
            }
            Delete | CreateDirectory => !matches!(self.node(), S3Node::Root),
            _ => true,
        }
    }
}

impl EntityAttributes for S3Entity {
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
        Err(FileError::unsupported(FileOperation::ChangeDate))
    }

    fn permissions(&self) -> FilePermissions {
        self.attributes.with(|a| a.permissions)
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        ChangeablePermissions::NONE
    }

    fn change_permissions(&self, _permissions: u16) -> Result<(), FileError> {
        Err(FileError::unsupported(FileOperation::ChangePermissions))
    }

    fn owner(&self) -> Option<String> {
        self.attributes.with(|a| a.owner.clone())
    }

    fn group(&self) -> Option<String> {
        None
    }

    fn can_get_owner(&self) -> bool {
        true
    }

    fn can_get_group(&self) -> bool {
        false
    }
}

impl EntityNavigation for S3Entity {
    fn parent(&self) -> Option<EntityRef> {
        self.parent.get_or_resolve(|| {
            let parent = self.location().parent()?;
            Some(self.related(parent, None) as EntityRef)
        })
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.parent.set(parent);
    }

    fn root(&self) -> EntityRef {
        if self.is_root() {
            if let Some(this) = self.this.upgrade() {
                return this;
            }
        }
        self.related(self.location().with_path("/"), Some(directory_attributes(None, None)))
    }

    fn is_root(&self) -> bool {
        matches!(self.node(), S3Node::Root)
    }

    /// The service root: every bucket of a realm is one volume.
    fn volume(&self) -> EntityRef {
        self.root()
    }
}

impl EntityContent for S3Entity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        let (bucket, key) = self.object_key(FileOperation::ReadFile)?;
        self.client_call("get_object", |client| client.get_object(bucket, key))
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        self.upload(Vec::new())
    }

    /// Objects cannot be appended to in place: the current content is
    /// downloaded and re-uploaded with the appended bytes.
    fn append_stream(&self) -> Result<OutputStream, FileError> {
        self.object_key(FileOperation::AppendFile)?;
        let mut existing = Vec::new();
        if self.exists() {
            self.input_stream()?
                .read_to_end(&mut existing)
                .map_err(|e| FileError::io("append", self.location(), e))?;
        }
        self.upload(existing)
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        Err(FileError::unsupported(FileOperation::RandomReadFile))
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        Err(FileError::unsupported(FileOperation::RandomWriteFile))
    }
}

impl EntityMutation for S3Entity {
    /// A bucket at the first level, a `key/` marker object below.
    fn mkdir(&self) -> Result<(), FileError> {
        match self.node() {
            S3Node::Root => return Err(FileError::unsupported(FileOperation::CreateDirectory)),
            S3Node::Bucket(bucket) => {
                self.client_call("create_bucket", |client| client.create_bucket(bucket))?;
            }
            S3Node::Object { bucket, .. } => {
                if self.exists() {
                    return Err(FileError::AlreadyExists {
                        location: self.location().to_string(),
                    });
                }
                let marker = self.node().prefix();
                self.client_call("mkdir", |client| client.put_object(bucket, &marker, &[]))?;
            }
        }
        debug!(location = %self.location(), "created directory");
        self.attributes.set(directory_attributes(Some(SystemTime::now()), None));
        Ok(())
    }

    /// Objects, empty buckets and empty directories only.
    fn delete(&self) -> Result<(), FileError> {
        match self.node() {
            S3Node::Root => return Err(FileError::unsupported(FileOperation::Delete)),
            S3Node::Bucket(bucket) => {
                self.client_call("delete_bucket", |client| client.delete_bucket(bucket))?;
            }
            S3Node::Object { bucket, key } => {
                if !self.exists() {
                    return Err(FileError::not_found(self.location()));
                }
                if self.is_directory() {
                    let (_, listing) = self.list_prefix()?;
                    if !listing.objects.is_empty() || !listing.common_prefixes.is_empty() {
                        return Err(FileError::protocol("delete", self.location(), "directory not empty"));
                    }
                    let marker = self.node().prefix();
                    self.client_call("delete_object", |client| client.delete_object(bucket, &marker))?;
                } else {
                    self.client_call("delete_object", |client| client.delete_object(bucket, key))?;
                }
            }
        }
        self.attributes.set(FileAttributes::missing());
        Ok(())
    }

    /// Server-side copy followed by delete. Only objects, within one realm.
    fn rename_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        ensure_same_volume(self, destination)?;
        let (bucket, key) = self.object_key(FileOperation::Rename)?;
        if self.is_directory() {
            return Err(FileError::unsupported(FileOperation::Rename));
        }
        self.copy_remotely_to(destination)?;
        self.client_call("delete_object", |client| client.delete_object(bucket, key))?;
        self.attributes.set(FileAttributes::missing());
        Ok(())
    }

    fn copy_remotely_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        if destination.backend_kind() != BackendKind::S3 || !self.location().same_realm(destination.location()) {
            return Err(FileError::unsupported(FileOperation::CopyRemotely));
        }
        let (bucket, key) = self.object_key(FileOperation::CopyRemotely)?;
        if self.is_directory() {
            return Err(FileError::unsupported(FileOperation::CopyRemotely));
        }
        let S3Node::Object {
            bucket: to_bucket,
            key: to_key,
        } = S3Node::from_location(destination.location())
        else {
            return Err(FileError::unsupported(FileOperation::CopyRemotely));
        };
        debug!(from = %self.location(), to = %destination.location(), "server-side copy");
        self.client_call("copy_object", |client| {
            client.copy_object(bucket, key, &to_bucket, &to_key)
        })
    }
}

impl EntityListing for S3Entity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        if let S3Node::Root = self.node() {
            let buckets = self.client_call("list_buckets", |client| client.list_buckets())?;
            return Ok(buckets
                .into_iter()
                .map(|bucket| self.child_entity(&bucket.name, directory_attributes(bucket.created, bucket.owner)))
                .collect());
        }
        if !self.is_directory() {
            if self.exists() {
                return Err(FileError::NotADirectory {
                    location: self.location().to_string(),
                });
            }
            return Err(FileError::not_found(self.location()));
        }

        let (prefix, listing) = self.list_prefix()?;
        let mut children = Vec::with_capacity(listing.common_prefixes.len() + listing.objects.len());
        for common in &listing.common_prefixes {
            let name = common
                .strip_prefix(&prefix)
                .unwrap_or(common)
                .trim_end_matches(DELIMITER);
            if !name.is_empty() {
                children.push(self.child_entity(name, directory_attributes(None, None)));
            }
        }
        for object in &listing.objects {
            let name = object.key.strip_prefix(&prefix).unwrap_or(&object.key);
            if !name.is_empty() && !name.contains(DELIMITER) {
                children.push(self.child_entity(name, object_attributes(object)));
            }
        }
        trace!(location = %self.location(), children = children.len(), "listed prefix");
        Ok(children)
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        ls_filtered_via(self, filter)
    }
}

impl EntitySpace for S3Entity {
    fn free_space(&self) -> Result<u64, FileError> {
        Err(FileError::unsupported(FileOperation::FreeSpace))
    }

    fn total_space(&self) -> Result<u64, FileError> {
        Err(FileError::unsupported(FileOperation::TotalSpace))
    }
}

/// Buffered object writer. Uploads the whole buffer on flush and on drop.
struct S3Upload {
    client: Arc<dyn S3Client>,
    bucket: String,
    key: String,
    location: Location,
    buffer: Vec<u8>,
    dirty: bool,
    entity: Weak<S3Entity>,
}

impl S3Upload {
    fn upload(&mut self) -> Result<(), FileError> {
        trace!(location = %self.location, bytes = self.buffer.len(), "uploading object");
        self.client
            .put_object(&self.bucket, &self.key, &self.buffer)
            .map_err(|e| e.into_file_error("put_object", &self.location))?;
        self.dirty = false;
        if let Some(entity) = self.entity.upgrade() {
            entity.attributes.invalidate();
        }
        Ok(())
    }
}

impl Write for S3Upload {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.dirty {
            self.upload().map_err(io::Error::other)?;
        }
        Ok(())
    }
}

impl Drop for S3Upload {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(error) = self.upload() {
                warn!(location = %self.location, %error, "upload on drop failed");
            }
        }
    }
}

/// [`EntityProvider`] for the `s3` scheme.
pub struct S3Provider {
    pool: S3Pool,
    ttl: Duration,
}

impl S3Provider {
    /// Provider with its own session pool.
    pub fn new(connector: Arc<dyn S3Connector>, config: &VfsConfig) -> Self {
        Self {
            pool: ConnectionPool::new(S3ConnectionFactory::new(connector), config.connection.clone()),
            ttl: config.attribute_ttl,
        }
    }

    /// The session pool, for maintenance and event subscription.
    pub fn pool(&self) -> &S3Pool {
        &self.pool
    }
}

impl EntityProvider for S3Provider {
    fn create(&self, location: Location, handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        Ok(S3Entity::from_location(location, self.pool.clone(), self.ttl, handle.as_ref())?)
    }
}
