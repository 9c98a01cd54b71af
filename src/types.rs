//! Core types shared by every backend.

use std::any::Any;
use std::fmt;
use std::io::{Read, Seek, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::FilePermissions;

/// The backend family an entity belongs to.
///
/// Closed: every entity reports one of these, and decorators report the
/// kind of the entity they wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendKind {
    /// Local disk or UNC share.
    Local,
    /// HTTP resource, HTML pages browsed as directories.
    Http,
    /// Object storage: buckets and objects.
    S3,
    /// Virtualization management hierarchy.
    Virt,
    /// Anything else (test doubles, third-party providers).
    Other,
}

/// Attribute snapshot of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileAttributes {
    /// Whether the entity exists.
    pub exists: bool,
    /// Whether it is a directory (or directory-like hierarchy level).
    pub is_directory: bool,
    /// Whether it is a symbolic link.
    pub is_symlink: bool,
    /// Size in bytes, `None` when unknown.
    pub size: Option<u64>,
    /// Last modification date, `None` when unknown.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub date: Option<SystemTime>,
    /// Permission bits.
    pub permissions: FilePermissions,
    /// Owner name, if the backend reports one.
    pub owner: Option<String>,
    /// Group name, if the backend reports one.
    pub group: Option<String>,
}

impl FileAttributes {
    /// Attributes of an entity that does not exist.
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_directory: false,
            is_symlink: false,
            size: None,
            date: None,
            permissions: FilePermissions::EMPTY,
            owner: None,
            group: None,
        }
    }

    /// Attributes of an existing plain file.
    pub fn file(size: u64, date: Option<SystemTime>) -> Self {
        Self {
            exists: true,
            size: Some(size),
            date,
            ..Self::missing()
        }
    }

    /// Attributes of an existing directory.
    pub fn directory(date: Option<SystemTime>) -> Self {
        Self {
            exists: true,
            is_directory: true,
            size: Some(0),
            date,
            ..Self::missing()
        }
    }

    /// Copy with permissions replaced.
    pub fn with_permissions(mut self, permissions: FilePermissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Default for FileAttributes {
    fn default() -> Self {
        Self::missing()
    }
}

/// Opaque backend-native object attached to an entity at creation.
///
/// A listing that already holds per-child native objects (a local path, an
/// object-storage summary) passes them along so the child does not resolve
/// them again. Not part of entity identity.
#[derive(Clone)]
pub struct NativeHandle(Arc<dyn Any + Send + Sync>);

impl NativeHandle {
    /// Wrap a native value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeHandle(..)")
    }
}

/// Seekable read stream with a known length.
pub trait RandomAccessInput: Read + Seek + Send {
    /// Total length in bytes.
    fn length(&mut self) -> std::io::Result<u64>;
}

/// Seekable write stream that can be resized.
pub trait RandomAccessOutput: Write + Seek + Send {
    /// Truncate or extend to `len` bytes.
    fn set_length(&mut self, len: u64) -> std::io::Result<()>;
}

/// Sequential read stream returned by entities.
pub type InputStream = Box<dyn Read + Send>;

/// Sequential write stream returned by entities.
pub type OutputStream = Box<dyn Write + Send>;

/// Serde support for optional `SystemTime` (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time.map(|t| {
            let d = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
            (d.as_secs(), d.subsec_nanos())
        })
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<(u64, u32)> = Deserialize::deserialize(deserializer)?;
        Ok(raw.map(|(secs, nanos)| UNIX_EPOCH + Duration::new(secs, nanos)))
    }
}
