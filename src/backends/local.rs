//! Local disk and UNC shares.
//!
//! Locations use the `file` scheme. A host component means a UNC share:
//! `file://server/share/dir` is `\\server\share\dir` on Windows and
//! `//server/share/dir` elsewhere. Drive paths are stored as `/C:/dir`.
//!
//! Attributes are read from the filesystem on every call; wrap the entity
//! in a [`CachedEntity`](crate::CachedEntity) for snapshot semantics.
//!
//! Streams are [`InterruptibleReader`]/[`InterruptibleWriter`]s bound to
//! the opening thread's [`CancelToken`](crate::CancelToken).

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::common::{ParentSlot, ensure_same_volume, ls_filtered_via};
use crate::interrupt::{InterruptibleReader, InterruptibleWriter};
use crate::traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntitySpace,
};
use crate::{
    BackendKind, ChangeablePermissions, EntityFilter, EntityProvider, EntityRef, FILE_SCHEME, FileEntity,
    FileError, FileOperation, FilePermissions, InputStream, Location, NativeHandle, OutputStream,
    PermissionBits, RandomAccessInput, RandomAccessOutput,
};

/// Native path of a `file` location.
pub fn native_path(location: &Location) -> PathBuf {
    let path = location.path();
    if let Some(host) = location.host() {
        return if cfg!(windows) {
            PathBuf::from(format!("\\\\{}{}", host, path.replace('/', "\\")))
        } else {
            PathBuf::from(format!("//{host}{path}"))
        };
    }
    if let Some(drive) = drive_of(path) {
        let rest = &path[3.min(path.len())..];
        return if cfg!(windows) {
            PathBuf::from(format!("{drive}:\\{}", rest.trim_start_matches('/').replace('/', "\\")))
        } else {
            PathBuf::from(format!("{drive}:/{}", rest.trim_start_matches('/')))
        };
    }
    PathBuf::from(path)
}

/// `file` location of a native path. Relative paths are made absolute.
pub fn location_for_path(path: &Path) -> Location {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let text = absolute.to_string_lossy();
    if let Some(unc) = text.strip_prefix("//") {
        return Location::parse(&format!("\\\\{}", unc.replace('/', "\\")))
            .unwrap_or_else(|_| Location::local(&text));
    }
    Location::parse(&text).unwrap_or_else(|_| Location::local(&text))
}

/// Errors meaning the destination exists and the platform will not replace
/// it. Anything else leaves the destination untouched.
fn refuses_to_replace(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::AlreadyExists {
        return true;
    }
    // ERROR_FILE_EXISTS, ERROR_ALREADY_EXISTS
    cfg!(windows) && matches!(error.raw_os_error(), Some(80 | 183))
}

/// `Some('C')` for `/C:` and `/C:/...`.
fn drive_of(path: &str) -> Option<char> {
    let bytes = path.as_bytes();
    let is_drive = bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
        && (bytes.len() == 3 || bytes[3] == b'/');
    is_drive.then(|| bytes[1] as char)
}

/// [`EntityProvider`] for the `file` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProvider;

impl EntityProvider for LocalProvider {
    fn create(&self, location: Location, handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        Ok(LocalEntity::from_location(location, handle.as_ref())?)
    }
}

/// An entity on a local or UNC filesystem.
pub struct LocalEntity {
    location: Location,
    path: PathBuf,
    parent: ParentSlot,
    this: Weak<LocalEntity>,
}

impl LocalEntity {
    /// Entity for a native path.
    pub fn new(path: impl AsRef<Path>) -> Arc<LocalEntity> {
        let location = location_for_path(path.as_ref());
        let path = native_path(&location);
        Self::build(location, path)
    }

    /// Entity for a `file` location, reusing a native `PathBuf` handle when
    /// one is supplied.
    pub fn from_location(location: Location, handle: Option<&NativeHandle>) -> Result<Arc<LocalEntity>, FileError> {
        if location.scheme() != FILE_SCHEME {
            return Err(FileError::InvalidLocation {
                input: location.to_string(),
                reason: "not a file location".to_string(),
            });
        }
        let path = handle
            .and_then(|handle| handle.downcast_ref::<PathBuf>().cloned())
            .unwrap_or_else(|| native_path(&location));
        Ok(Self::build(location, path))
    }

    fn build(location: Location, path: PathBuf) -> Arc<LocalEntity> {
        Arc::new_cyclic(|this| LocalEntity {
            location,
            path,
            parent: ParentSlot::new(),
            this: this.clone(),
        })
    }

    /// The native path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn self_ref(&self) -> Option<EntityRef> {
        self.this.upgrade().map(|this| this as EntityRef)
    }

    fn metadata(&self) -> Option<fs::Metadata> {
        fs::metadata(&self.path).ok()
    }

    fn io_error(&self, operation: &'static str, error: io::Error) -> FileError {
        FileError::from_io(operation, &self.location, error)
    }

    fn is_top(&self) -> bool {
        Self::location_is_top(&self.location)
    }

    fn root_location(&self) -> Location {
        let mut current = self.location.clone();
        while !Self::location_is_top(&current) {
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Drive roots, UNC share roots and `/` have no parent.
    fn location_is_top(location: &Location) -> bool {
        location.is_root()
            || (location.host().is_some() && location.depth() <= 1)
            || (location.depth() == 1 && drive_of(location.path()).is_some())
    }

    /// The mount point containing this entity (or its nearest existing
    /// ancestor, for entities that do not exist yet).
    fn volume_path(&self) -> PathBuf {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            let mut current = self.path.clone();
            let device = loop {
                match fs::metadata(&current) {
                    Ok(meta) => break Some(meta.dev()),
                    Err(_) if current.pop() => continue,
                    Err(_) => break None,
                }
            };
            let Some(device) = device else {
                return PathBuf::from("/");
            };
            while let Some(parent) = current.parent() {
                match fs::metadata(parent) {
                    Ok(meta) if meta.dev() == device => current = parent.to_path_buf(),
                    _ => break,
                }
            }
            current
        }
        #[cfg(not(unix))]
        {
            self.path
                .ancestors()
                .last()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.path.clone())
        }
    }

    fn child_entity(&self, name: &str, path: PathBuf) -> EntityRef {
        let child = Self::build(self.location.child(name), path);
        child.parent.set(self.self_ref());
        child
    }

    fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
        if fs::symlink_metadata(source)?.is_dir() {
            fs::create_dir_all(destination)?;
            for entry in fs::read_dir(source)? {
                let entry = entry?;
                Self::copy_tree(&entry.path(), &destination.join(entry.file_name()))?;
            }
            Ok(())
        } else {
            fs::copy(source, destination).map(|_| ())
        }
    }

    fn remove(path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    #[cfg(windows)]
    fn attributes_flag(&self, flag: u32) -> bool {
        use std::os::windows::fs::MetadataExt;

        self.metadata()
            .is_some_and(|meta| meta.file_attributes() & flag != 0)
    }
}

impl EntityCore for LocalEntity {
    fn location(&self) -> &Location {
        &self.location
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn supports(&self, operation: FileOperation) -> bool {
        match operation {
            FileOperation::FreeSpace | FileOperation::TotalSpace => cfg!(unix),
            _ => true,
        }
    }
}

impl EntityAttributes for LocalEntity {
    fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    fn is_directory(&self) -> bool {
        self.metadata().is_some_and(|meta| meta.is_dir())
    }

    fn is_symlink(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok_and(|meta| meta.file_type().is_symlink())
    }

    fn is_hidden(&self) -> bool {
        #[cfg(windows)]
        {
            // FILE_ATTRIBUTE_HIDDEN
            self.attributes_flag(0x2)
        }
        #[cfg(not(windows))]
        {
            self.location
                .file_name()
                .is_some_and(|name| name.starts_with('.'))
        }
    }

    fn is_system(&self) -> bool {
        #[cfg(windows)]
        {
            // FILE_ATTRIBUTE_SYSTEM
            self.attributes_flag(0x4)
        }
        #[cfg(not(windows))]
        {
            false
        }
    }

    fn size(&self) -> Option<u64> {
        self.metadata().map(|meta| meta.len())
    }

    fn date(&self) -> Option<SystemTime> {
        self.metadata().and_then(|meta| meta.modified().ok())
    }

    fn change_date(&self, date: SystemTime) -> Result<(), FileError> {
        let file = if self.is_directory() {
            File::open(&self.path)
        } else {
            OpenOptions::new().write(true).open(&self.path)
        }
        .map_err(|e| self.io_error("change_date", e))?;
        file.set_modified(date)
            .map_err(|e| self.io_error("change_date", e))
    }

    fn permissions(&self) -> FilePermissions {
        let Some(meta) = self.metadata() else {
            return FilePermissions::EMPTY;
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            FilePermissions::from_mode(meta.permissions().mode())
        }
        #[cfg(not(unix))]
        {
            let mut value = 0o400;
            if !meta.permissions().readonly() {
                value |= 0o200;
            }
            if meta.is_dir() {
                value |= 0o100;
            }
            FilePermissions::new(value, 0o700)
        }
    }

    fn changeable_permissions(&self) -> ChangeablePermissions {
        ChangeablePermissions::local()
    }

    fn change_permissions(&self, bits: u16) -> Result<(), FileError> {
        let current = self.permissions().int_value();
        self.changeable_permissions().check(current, bits)?;
        let meta = fs::metadata(&self.path).map_err(|e| self.io_error("change_permissions", e))?;
        let mut permissions = meta.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            permissions.set_mode(u32::from(bits));
        }
        #[cfg(not(unix))]
        {
            permissions.set_readonly(bits & 0o200 == 0);
        }
        debug!(location = %self.location, bits = format_args!("{bits:o}"), "changing permissions");
        fs::set_permissions(&self.path, permissions).map_err(|e| self.io_error("change_permissions", e))
    }

    fn owner(&self) -> Option<String> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            self.metadata().map(|meta| meta.uid().to_string())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    fn group(&self) -> Option<String> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            self.metadata().map(|meta| meta.gid().to_string())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    fn can_get_owner(&self) -> bool {
        cfg!(unix)
    }

    fn can_get_group(&self) -> bool {
        cfg!(unix)
    }
}

impl EntityNavigation for LocalEntity {
    fn parent(&self) -> Option<EntityRef> {
        self.parent.get_or_resolve(|| {
            if self.is_top() {
                return None;
            }
            let location = self.location.parent()?;
            let path = native_path(&location);
            Some(Self::build(location, path) as EntityRef)
        })
    }

    fn set_parent(&self, parent: Option<EntityRef>) {
        self.parent.set(parent);
    }

    fn root(&self) -> EntityRef {
        if self.is_top() {
            if let Some(this) = self.self_ref() {
                return this;
            }
        }
        let location = self.root_location();
        let path = native_path(&location);
        Self::build(location, path)
    }

    fn is_root(&self) -> bool {
        self.is_top()
    }

    fn volume(&self) -> EntityRef {
        let path = self.volume_path();
        if path == self.path {
            if let Some(this) = self.self_ref() {
                return this;
            }
        }
        LocalEntity::new(path)
    }
}

impl EntityContent for LocalEntity {
    fn input_stream(&self) -> Result<InputStream, FileError> {
        let file = File::open(&self.path).map_err(|e| self.io_error("open", e))?;
        Ok(Box::new(InterruptibleReader::new(file)))
    }

    fn output_stream(&self) -> Result<OutputStream, FileError> {
        let file = File::create(&self.path).map_err(|e| self.io_error("create", e))?;
        Ok(Box::new(InterruptibleWriter::new(file)))
    }

    fn append_stream(&self) -> Result<OutputStream, FileError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.io_error("append", e))?;
        Ok(Box::new(InterruptibleWriter::new(file)))
    }

    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError> {
        let file = File::open(&self.path).map_err(|e| self.io_error("open", e))?;
        Ok(Box::new(InterruptibleReader::new(file)))
    }

    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.io_error("open", e))?;
        Ok(Box::new(InterruptibleWriter::new(file)))
    }
}

impl RandomAccessInput for InterruptibleReader<File> {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().metadata()?.len())
    }
}

impl RandomAccessOutput for InterruptibleWriter<File> {
    fn set_length(&mut self, len: u64) -> io::Result<()> {
        self.token().check()?;
        self.get_ref().set_len(len)
    }
}

impl EntityMutation for LocalEntity {
    fn mkdir(&self) -> Result<(), FileError> {
        fs::create_dir(&self.path).map_err(|e| self.io_error("mkdir", e))
    }

    fn delete(&self) -> Result<(), FileError> {
        Self::remove(&self.path).map_err(|e| self.io_error("delete", e))
    }

    /// Overwrite-capable move. Where the platform refuses to replace an
    /// existing destination, the destination is deleted first; that
    /// fallback is not atomic.
    fn rename_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        ensure_same_volume(self, destination)?;
        let target = native_path(destination.location());
        match fs::rename(&self.path, &target) {
            Ok(()) => Ok(()),
            Err(error) if refuses_to_replace(&error) && target.exists() => {
                debug!(
                    from = %self.location,
                    to = %destination.location(),
                    %error,
                    "rename refused to overwrite, deleting destination first"
                );
                Self::remove(&target).map_err(|e| FileError::from_io("rename", destination.location(), e))?;
                fs::rename(&self.path, &target).map_err(|e| self.io_error("rename", e))
            }
            Err(error) => Err(self.io_error("rename", error)),
        }
    }

    fn copy_remotely_to(&self, destination: &dyn FileEntity) -> Result<(), FileError> {
        if destination.backend_kind() != BackendKind::Local {
            return Err(FileError::unsupported(FileOperation::CopyRemotely));
        }
        let target = native_path(destination.location());
        trace!(from = %self.location, to = %destination.location(), "local copy");
        Self::copy_tree(&self.path, &target).map_err(|e| self.io_error("copy", e))
    }
}

impl EntityListing for LocalEntity {
    fn ls(&self) -> Result<Vec<EntityRef>, FileError> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(error) if self.exists() && !self.is_directory() => {
                trace!(location = %self.location, %error, "listing a non-directory");
                return Err(FileError::NotADirectory {
                    location: self.location.to_string(),
                });
            }
            Err(error) => return Err(self.io_error("ls", error)),
        };
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error("ls", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            children.push(self.child_entity(&name, entry.path()));
        }
        Ok(children)
    }

    fn ls_filtered(&self, filter: &dyn EntityFilter) -> Result<Vec<EntityRef>, FileError> {
        ls_filtered_via(self, filter)
    }
}

impl EntitySpace for LocalEntity {
    fn free_space(&self) -> Result<u64, FileError> {
        #[cfg(unix)]
        {
            let stat = rustix::fs::statvfs(self.volume_path().as_path())
                .map_err(|e| self.io_error("free_space", e.into()))?;
            Ok(stat.f_bavail.saturating_mul(stat.f_frsize))
        }
        #[cfg(not(unix))]
        {
            Err(FileError::unsupported(FileOperation::FreeSpace))
        }
    }

    fn total_space(&self) -> Result<u64, FileError> {
        #[cfg(unix)]
        {
            let stat = rustix::fs::statvfs(self.volume_path().as_path())
                .map_err(|e| self.io_error("total_space", e.into()))?;
            Ok(stat.f_blocks.saturating_mul(stat.f_frsize))
        }
        #[cfg(not(unix))]
        {
            Err(FileError::unsupported(FileOperation::TotalSpace))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unc_location_maps_to_native_share() {
        let location = Location::parse("\\\\srv\\share\\dir").unwrap();
        let path = native_path(&location);
        if cfg!(windows) {
            assert_eq!(path, PathBuf::from("\\\\srv\\share\\dir"));
        } else {
            assert_eq!(path, PathBuf::from("//srv/share/dir"));
        }
    }

    #[test]
    fn drive_location_maps_to_native() {
        let location = Location::parse("C:\\Users\\me").unwrap();
        assert_eq!(location.path(), "/C:/Users/me");
        let path = native_path(&location);
        if cfg!(windows) {
            assert_eq!(path, PathBuf::from("C:\\Users\\me"));
        } else {
            assert_eq!(path, PathBuf::from("C:/Users/me"));
        }
    }

    #[test]
    fn drive_detection() {
        assert_eq!(drive_of("/C:"), Some('C'));
        assert_eq!(drive_of("/d:/x"), Some('d'));
        assert_eq!(drive_of("/CD/x"), None);
        assert_eq!(drive_of("/"), None);
    }

    #[cfg(unix)]
    #[test]
    fn root_has_no_parent() {
        let root = LocalEntity::new("/");
        assert!(root.is_root());
        assert!(root.parent().is_none());
        let tmp = LocalEntity::new("/tmp");
        assert_eq!(tmp.root().location().path(), "/");
    }

    #[cfg(unix)]
    #[test]
    fn hidden_follows_dot_prefix() {
        assert!(LocalEntity::new("/tmp/.hidden").is_hidden());
        assert!(!LocalEntity::new("/tmp/visible").is_hidden());
    }

    #[test]
    fn handle_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let handle = NativeHandle::new(dir.path().to_path_buf());
        let entity = LocalEntity::from_location(Location::local("/not/the/real/path"), Some(&handle)).unwrap();
        assert_eq!(entity.path(), dir.path());
        assert!(entity.is_directory());
    }

    #[test]
    fn non_file_scheme_is_rejected() {
        let location = Location::parse("s3://host/bucket").unwrap();
        assert!(LocalEntity::from_location(location, None).is_err());
    }
}
