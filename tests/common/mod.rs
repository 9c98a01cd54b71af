//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use anyfile::*;

// =============================================================================
// Recording entity
// =============================================================================

/// Entity that logs every call as a [`FileOperation`] and answers from
/// mutable fields, so tests can change the "backend" state behind a
/// decorator.
pub struct RecordingEntity {
    location: Location,
    pub calls: Mutex<Vec<FileOperation>>,
    pub size: AtomicU64,
    pub exists: AtomicBool,
}

impl RecordingEntity {
    pub fn new(path: &str) -> Arc<Self> {
        Self::at(Location::parse(&format!("mem://host{path}")).unwrap())
    }

    pub fn at(location: Location) -> Arc<Self> {
        Arc::new(Self {
            location,
            calls: Mutex::new(Vec::new()),
            size: AtomicU64::new(10),
            exists: AtomicBool::new(true),
        })
    }

    pub fn calls(&self) -> Vec<FileOperation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: FileOperation) -> usize {
        self.calls().iter().filter(|op| **op == operation).count()
    }

    fn record(&self, operation: FileOperation) {
        self.calls.lock().unwrap().push(operation);
    }

    fn sibling(&self, path: &str) -> EntityRef {
        RecordingEntity::new(path)
    }
}

impl EntityCore for RecordingEntity {
    fn location(&self) -> &Location {
        &self.location
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Other
    }

    fn supports(&self, _operation: FileOperation) -> bool {
        true
    }
}

impl EntityAttributes for RecordingEntity {
    fn exists(&self) -> bool {
        self.record(FileOperation::Exists);
        self.exists.load(Ordering::SeqCst)
    }

    fn is_directory(&self) -> bool {
        self.record(FileOperation::IsDirectory);
        false
    }

    fn is_symlink(&self) -> bool {
        self.record(FileOperation::IsSymlink);
        false
    }

    fn is_hidden(&self) -> bool {
        self.record(FileOperation::IsHidden);
        false
    }

    fn is_system(&self) -> bool {
        self.record(FileOperation::IsSystem);
        false
    }

    fn size(&self) -> Option<u64> {
        self.record(FileOperation::Size);
        Some(self.size.load(Ordering::SeqCst))
    }

    fn date(&self) -> Option<SystemTime> {
        self.record(FileOperation::Date);
        Some(SystemTime::UNIX_EPOCH)
    }

    fn change_date(&self, _date: SystemTime) -> Result<(), FileError> {
        self.record(FileOperation::ChangeDate);
        Ok(())
    }

    fn permissions(&self) -> FilePermissions {
        self.record(FileOperation::Permissions);
        FilePermissions::DEFAULT_FILE
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        self.record(FileOperation::ChangeablePermissions);
        ChangeablePermissions::ALL
    }

    fn change_permissions(&self, _permissions: u16) -> Result<(), FileError> {
        self.record(FileOperation::ChangePermissions);
        Ok(())
    }

    fn owner(&self) -> Option<String> {
        self.record(FileOperation::Owner);
        Some("alice".into())
    }

    fn group(&self) -> Option<String> {
        self.record(FileOperation::Group);
        Some("staff".into())
    }

    fn can_get_owner(&self) -> bool {
        self.record(FileOperation::CanGetOwner);
        true
    }

    fn can_get_group(&self) -> bool {
        self.record(FileOperation::CanGetGroup);
        true
    }
}

impl EntityNavigation for RecordingEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.record(FileOperation::Parent);
        Some(self.sibling("/"))
    }

    fn set_parent(&self, _parent: Option<EntityRef>) {
        self.record(FileOperation::SetParent);
    }

    fn root(&self) -> EntityRef {
        self.record(FileOperation::Root);
        self.sibling("/")
    }

    fn is_root(&self) -> bool {
        self.record(FileOperation::IsRoot);
        false
    }

    fn volume(&self) -> EntityRef {
        self.record(FileOperation::Volume);
        self.sibling("/")
    }
}

impl EntityContent for RecordingEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        self.record(FileOperation::ReadFile);
        Ok(Box::new(Cursor::new(b"data".to_vec())))
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        self.record(FileOperation::WriteFile);
        Ok(Box::new(Vec::new()))
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        self.record(FileOperation::AppendFile);
        Ok(Box::new(Vec::new()))
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        self.record(FileOperation::RandomReadFile);
        Err(FileError::unsupported(FileOperation::RandomReadFile))
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        self.record(FileOperation::RandomWriteFile);
        Err(FileError::unsupported(FileOperation::RandomWriteFile))
    }
}

impl EntityMutation for RecordingEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        self.record(FileOperation::CreateDirectory);
        Ok(())
    }

    fn delete(&self) -> Result<(), FileError> {
        self.record(FileOperation::Delete);
        Ok(())
    }

    fn rename_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        self.record(FileOperation::Rename);
        Ok(())
    }

    fn copy_remotely_to(&self, _destination: &dyn FileEntity) -> Result<(), FileError> {
        self.record(FileOperation::CopyRemotely);
        Ok(())
    }
}

impl EntityListing for RecordingEntity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        self.record(FileOperation::ListChildren);
        Ok(vec![self.sibling("/a"), self.sibling("/b")])
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        self.record(FileOperation::ListChildrenFiltered);
        Ok(filter.filter_entities(vec![self.sibling("/a"), self.sibling("/b")]))
    }
}

impl EntitySpace for RecordingEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        self.record(FileOperation::FreeSpace);
        Ok(100)
    }

    fn total_space(&self) -> Result<u64, FileError> {
        self.record(FileOperation::TotalSpace);
        Ok(1000)
    }
}

/// Invoke `operation` on `entity`. The match has no wildcard arm, so a new
/// operation that is not dispatched here fails to compile.
pub fn invoke(entity: &dyn FileEntity, operation: FileOperation) {
    let other = RecordingEntity::new("/other");
    match operation {
        FileOperation::Exists => drop(entity.exists()),
        FileOperation::IsDirectory => drop(entity.is_directory()),
        FileOperation::IsSymlink => drop(entity.is_symlink()),
        FileOperation::IsHidden => drop(entity.is_hidden()),
        FileOperation::IsSystem => drop(entity.is_system()),
        FileOperation::Size => drop(entity.size()),
        FileOperation::Date => drop(entity.date()),
        FileOperation::ChangeDate => drop(entity.change_date(SystemTime::UNIX_EPOCH)),
        FileOperation::Permissions => drop(entity.permissions()),
        FileOperation::ChangeablePermissions => drop(entity.changeable_permissions()),
        FileOperation::ChangePermissions => drop(entity.change_permissions(0o600)),
        FileOperation::Owner => drop(entity.owner()),
        FileOperation::Group => drop(entity.group()),
        FileOperation::CanGetOwner => drop(entity.can_get_owner()),
        FileOperation::CanGetGroup => drop(entity.can_get_group()),
        FileOperation::Parent => drop(entity.parent()),
        FileOperation::SetParent => entity.set_parent(None),
        FileOperation::Root => drop(entity.root()),
        FileOperation::IsRoot => drop(entity.is_root()),
        FileOperation::Volume => drop(entity.volume()),
        FileOperation::ReadFile => drop(entity.input_stream()),
        FileOperation::WriteFile => drop(entity.output_stream()),
        FileOperation::AppendFile => drop(entity.append_stream()),
        FileOperation::RandomReadFile => drop(entity.random_access_input()),
        FileOperation::RandomWriteFile => drop(entity.random_access_output()),
        FileOperation::CreateDirectory => drop(entity.mkdir()),
        FileOperation::Delete => drop(entity.delete()),
        FileOperation::Rename => drop(entity.rename_to(other.as_ref())),
        FileOperation::CopyRemotely => drop(entity.copy_remotely_to(other.as_ref())),
        FileOperation::ListChildren => drop(entity.ls()),
        FileOperation::ListChildrenFiltered => drop(entity.ls_filtered(&HiddenFilter)),
        FileOperation::FreeSpace => drop(entity.free_space()),
        FileOperation::TotalSpace => drop(entity.total_space()),
    }
}

// =============================================================================
// Counting connection factory
// =============================================================================

#[derive(Default)]
pub struct ConnectStats {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub keep_alives: AtomicUsize,
}

pub struct CountingConnection {
    stats: Arc<ConnectStats>,
    connect_delay: Duration,
    connected: AtomicBool,
}

impl CountingConnection {
    /// Simulate the server dropping the session.
    pub fn drop_session(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Connection for CountingConnection {
    fn connect(&self) -> Result<(), FileError> {
        thread::sleep(self.connect_delay);
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn keep_alive(&self) -> Result<(), FileError> {
        self.stats.keep_alives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct CountingFactory {
    pub stats: Arc<ConnectStats>,
    pub connect_delay: Duration,
}

impl CountingFactory {
    pub fn new(connect_delay: Duration) -> Self {
        Self {
            stats: Arc::default(),
            connect_delay,
        }
    }
}

impl ConnectionFactory for CountingFactory {
    type Connection = CountingConnection;

    fn create(&self, _realm: &Realm) -> Result<CountingConnection, FileError> {
        Ok(CountingConnection {
            stats: Arc::clone(&self.stats),
            connect_delay: self.connect_delay,
            connected: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// In-memory object storage
// =============================================================================

#[derive(Default)]
pub struct MemoryS3 {
    pub buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    pub connects: AtomicUsize,
    pub head_calls: AtomicUsize,
    /// Login accepted by `connect`; `None` accepts anyone.
    pub accepted_login: Option<String>,
}

impl MemoryS3 {
    pub fn with_objects(objects: &[(&str, &str, &[u8])]) -> Arc<Self> {
        let s3 = MemoryS3::default();
        {
            let mut buckets = s3.buckets.lock().unwrap();
            for (bucket, key, data) in objects {
                let bucket = buckets.entry(bucket.to_string()).or_default();
                if !key.is_empty() {
                    bucket.insert(key.to_string(), data.to_vec());
                }
            }
        }
        Arc::new(s3)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets.lock().unwrap().get(bucket)?.get(key).cloned()
    }

    fn summary(key: &str, data: &[u8]) -> S3Object {
        S3Object {
            key: key.to_string(),
            size: data.len() as u64,
            last_modified: Some(SystemTime::UNIX_EPOCH),
            owner: Some("owner".to_string()),
        }
    }
}

pub struct MemoryS3Connector(pub Arc<MemoryS3>);

impl S3Connector for MemoryS3Connector {
    fn connect(&self, realm: &Realm) -> Result<Arc<dyn S3Client>, S3Error> {
        if let Some(expected) = &self.0.accepted_login {
            let login = realm.credentials().map(|c| c.login().to_string());
            if login.as_deref() != Some(expected.as_str()) {
                return Err(S3Error::InvalidCredentials);
            }
        }
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.0) as Arc<dyn S3Client>)
    }
}

impl S3Client for MemoryS3 {
    fn list_buckets(&self) -> Result<Vec<S3Bucket>, S3Error> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .map(|name| S3Bucket {
                name: name.clone(),
                created: Some(SystemTime::UNIX_EPOCH),
                owner: None,
            })
            .collect())
    }

    fn head_bucket(&self, bucket: &str) -> Result<Option<S3Bucket>, S3Error> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.buckets.lock().unwrap().contains_key(bucket).then(|| S3Bucket {
            name: bucket.to_string(),
            created: None,
            owner: None,
        }))
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), S3Error> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(S3Error::AlreadyExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), S3Error> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(S3Error::NoSuchBucket(bucket.to_string())),
            Some(objects) if !objects.is_empty() => Err(S3Error::BucketNotEmpty(bucket.to_string())),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    fn list_objects(&self, bucket: &str, prefix: &str, delimiter: Option<&str>) -> Result<S3Listing, S3Error> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| S3Error::NoSuchBucket(bucket.to_string()))?;
        let mut listing = S3Listing::default();
        for (key, data) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match delimiter.and_then(|d| rest.find(d).map(|idx| idx + d.len())) {
                Some(end) => {
                    let common = format!("{prefix}{}", &rest[..end]);
                    if !listing.common_prefixes.contains(&common) {
                        listing.common_prefixes.push(common);
                    }
                }
                None => listing.objects.push(Self::summary(key, data)),
            }
        }
        Ok(listing)
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<S3Object>, S3Error> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| S3Error::NoSuchBucket(bucket.to_string()))?;
        Ok(objects.get(key).map(|data| Self::summary(key, data)))
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + Send>, S3Error> {
        self.object(bucket, key)
            .map(|data| Box::new(Cursor::new(data)) as Box<dyn Read + Send>)
            .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), S3Error> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| S3Error::NoSuchBucket(bucket.to_string()))?;
        objects.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn copy_object(&self, bucket: &str, key: &str, to_bucket: &str, to_key: &str) -> Result<(), S3Error> {
        let data = self
            .object(bucket, key)
            .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?;
        self.put_object(to_bucket, to_key, &data)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3Error> {
        if let Some(objects) = self.buckets.lock().unwrap().get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}

// =============================================================================
// Fake virtualization manager
// =============================================================================

pub struct FakeVirt {
    /// domain -> pool -> disks
    pub tree: Mutex<BTreeMap<String, BTreeMap<String, Vec<VirtDisk>>>>,
    pub calls: AtomicUsize,
    pub connects: AtomicUsize,
    pub keep_alives: AtomicUsize,
    /// Cleared to simulate a dropped session; `connect` sets it again.
    pub alive: Arc<AtomicBool>,
    /// Number of upcoming calls that fail with `ConnectionLost`.
    pub fail_next: AtomicUsize,
}

impl FakeVirt {
    pub fn sample() -> Arc<Self> {
        let disk = |name: &str, capacity: u64| VirtDisk {
            name: name.to_string(),
            capacity,
            modified: None,
        };
        let mut tree = BTreeMap::new();
        tree.insert(
            "dc1".to_string(),
            BTreeMap::from([
                ("fast".to_string(), vec![disk("web.img", 2048), disk("db.img", 4096)]),
                ("slow".to_string(), vec![]),
            ]),
        );
        tree.insert("dc2".to_string(), BTreeMap::new());
        Arc::new(FakeVirt {
            tree: Mutex::new(tree),
            calls: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            keep_alives: AtomicUsize::new(0),
            alive: Arc::new(AtomicBool::new(false)),
            fail_next: AtomicUsize::new(0),
        })
    }
}

pub struct FakeVirtConnector(pub Arc<FakeVirt>);

impl VirtConnector for FakeVirtConnector {
    fn connect(&self, _realm: &Realm) -> Result<Box<dyn VirtManager>, VirtError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        self.0.alive.store(true, Ordering::SeqCst);
        Ok(Box::new(FakeVirtSession(Arc::clone(&self.0))))
    }
}

pub struct FakeVirtSession(Arc<FakeVirt>);

impl FakeVirtSession {
    fn enter(&self) -> Result<(), VirtError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.0.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.0.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(VirtError::ConnectionLost);
        }
        Ok(())
    }

    fn pool_disks<R>(
        &self,
        domain: &str,
        pool: &str,
        f: impl FnOnce(&mut Vec<VirtDisk>) -> R,
    ) -> Result<R, VirtError> {
        let mut tree = self.0.tree.lock().unwrap();
        let disks = tree
            .get_mut(domain)
            .and_then(|pools| pools.get_mut(pool))
            .ok_or_else(|| VirtError::NoSuchObject(format!("{domain}/{pool}")))?;
        Ok(f(disks))
    }
}

impl VirtManager for FakeVirtSession {
    fn list_domains(&mut self) -> Result<Vec<String>, VirtError> {
        self.enter()?;
        Ok(self.0.tree.lock().unwrap().keys().cloned().collect())
    }

    fn list_pools(&mut self, domain: &str) -> Result<Vec<String>, VirtError> {
        self.enter()?;
        self.0
            .tree
            .lock()
            .unwrap()
            .get(domain)
            .map(|pools| pools.keys().cloned().collect())
            .ok_or_else(|| VirtError::NoSuchObject(domain.to_string()))
    }

    fn list_disks(&mut self, domain: &str, pool: &str) -> Result<Vec<VirtDisk>, VirtError> {
        self.enter()?;
        self.pool_disks(domain, pool, |disks| disks.clone())
    }

    fn disk_info(&mut self, domain: &str, pool: &str, disk: &str) -> Result<Option<VirtDisk>, VirtError> {
        self.enter()?;
        self.pool_disks(domain, pool, |disks| disks.iter().find(|d| d.name == disk).cloned())
    }

    fn open_disk(&mut self, domain: &str, pool: &str, disk: &str) -> Result<Box<dyn Read + Send>, VirtError> {
        self.enter()?;
        let capacity = self
            .pool_disks(domain, pool, |disks| disks.iter().find(|d| d.name == disk).map(|d| d.capacity))?
            .ok_or_else(|| VirtError::NoSuchObject(disk.to_string()))?;
        Ok(Box::new(Cursor::new(vec![0u8; capacity as usize])))
    }

    fn delete_disk(&mut self, domain: &str, pool: &str, disk: &str) -> Result<(), VirtError> {
        self.enter()?;
        let removed = self.pool_disks(domain, pool, |disks| {
            let before = disks.len();
            disks.retain(|d| d.name != disk);
            before != disks.len()
        })?;
        if removed {
            Ok(())
        } else {
            Err(VirtError::NoSuchObject(disk.to_string()))
        }
    }

    fn keep_alive(&mut self) -> Result<(), VirtError> {
        self.0.keep_alives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.0.alive.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Scripted HTTP transport
// =============================================================================

#[derive(Default)]
pub struct ScriptedHttp {
    pub pages: HashMap<String, (HttpHead, Vec<u8>)>,
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
}

impl ScriptedHttp {
    pub fn page(mut self, url: &str, content_type: &str, body: &str) -> Self {
        let head = HttpHead {
            status: 200,
            content_type: Some(content_type.to_string()),
            content_length: Some(body.len() as u64),
            last_modified: Some("Tue, 15 Nov 1994 08:12:31 GMT".to_string()),
        };
        self.pages.insert(url.to_string(), (head, body.as_bytes().to_vec()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        let head = HttpHead {
            status,
            ..HttpHead::default()
        };
        self.pages.insert(url.to_string(), (head, Vec::new()));
        self
    }

    fn lookup(&self, url: &url::Url) -> Result<(HttpHead, Vec<u8>), HttpError> {
        let mut key = url.clone();
        let _ = key.set_username("");
        let _ = key.set_password(None);
        let entry = self
            .pages
            .get(key.as_str())
            .or_else(|| self.pages.get(key.as_str().trim_end_matches('/')))
            .cloned()
            .ok_or(HttpError::Status { status: 404 })?;
        if entry.0.status >= 400 {
            return Err(HttpError::Status { status: entry.0.status });
        }
        Ok(entry)
    }
}

impl HttpTransport for ScriptedHttp {
    fn head(&self, url: &url::Url) -> Result<HttpHead, HttpError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.lookup(url).map(|(head, _)| head)
    }

    fn get(&self, url: &url::Url) -> Result<Box<dyn Read + Send>, HttpError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.lookup(url)
            .map(|(_, body)| Box::new(Cursor::new(body)) as Box<dyn Read + Send>)
    }
}
