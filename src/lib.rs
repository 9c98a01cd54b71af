//! # anyfile
//!
//! A uniform **file-entity contract** over very different storage backends,
//! plus the machinery that makes remote files behave like local ones.
//!
//! Every file, directory, bucket, web page or disk image is a
//! [`FileEntity`]: one object answering the same questions (does it exist,
//! how big is it, who is its parent, what are its children) and offering
//! the same streams and mutations, whatever sits behind it.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use anyfile::{EntityExt, EntityFactory, FileError, FileOperation};
//!
//! fn describe(input: &str) -> Result<(), FileError> {
//!     let factory = EntityFactory::with_defaults();
//!     let entity = factory.get(input)?;
//!     if entity.is_directory() && entity.supports(FileOperation::ListChildren) {
//!         for child in entity.ls()? {
//!             println!("{} {:?}", child.location(), child.size());
//!         }
//!     } else if entity.is_file() {
//!         println!("{} bytes", entity.read_all()?.len());
//!     }
//!     Ok(())
//! }
//! # describe("/tmp").unwrap();
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileEntity`] | The capability contract, composed of seven component traits |
//! | [`EntityRef`] | Shared handle, `Arc<dyn FileEntity>` |
//! | [`Location`] | Parsed locator: scheme, host, port, path, credentials, properties |
//! | [`Realm`] | Scheme + host + port + credentials, the pooling key |
//! | [`FileOperation`] | Closed set of contract operations, for introspection and errors |
//! | [`FileError`] | Error taxonomy shared by every backend |
//! | [`FilePermissions`] | 9-bit permission snapshot with a "known bits" mask |
//! | [`ChangeablePermissions`] | Bits a backend lets callers change |
//! | [`EntityFactory`] | Scheme-keyed registry turning locations into entities |
//!
//! ---
//!
//! ## Backends
//!
//! | Backend | Scheme | Notes |
//! |---------|--------|-------|
//! | [`LocalEntity`] | `file` | local disks and UNC shares, cancellable streams |
//! | [`HttpEntity`] | `http(s)` | read-only, HTML pages browsed as directories |
//! | [`S3Entity`] | `s3` | buckets, objects and prefixes, pooled sessions |
//! | [`VirtEntity`] | `virt` | domain → pool → disk management hierarchy |
//!
//! Wire-level clients are not part of this crate: remote backends talk to
//! small boundary traits ([`HttpTransport`], [`S3Client`], [`VirtManager`]).
//!
//! ---
//!
//! ## Infrastructure
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ConnectionPool`] | One session per realm, single connect at a time, idle pruning, keep-alive |
//! | [`SyncedAttributes`] | TTL-bounded attribute snapshot, refresh failures absorbed |
//! | [`ProxyEntity`] / [`CachedEntity`] / [`DelayedEntity`] | Decorators over any entity |
//! | [`BufferPool`] | Reuse of large transient I/O buffers |
//! | [`CancelToken`] | Cooperative cancellation of long transfers |
//!
//! ---
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, FileError>`. Operations a
//! backend cannot perform fail with [`FileError::Unsupported`]; probe with
//! [`EntityCore::supports`] first. Authentication failures carry the
//! [`Realm`] so a caller can re-prompt and retry:
//!
//! ```rust
//! use anyfile::{FileError, Location};
//!
//! let location = Location::parse("s3://key@storage.example.com/bucket").unwrap();
//! let err = FileError::AuthenticationRequired { realm: location.realm() };
//! assert!(err.is_user_recoverable());
//! assert_eq!(err.to_string(), "authentication required for s3://key@storage.example.com:443");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` and every method takes `&self`.
//! Reads and listings are safe from many threads; concurrent mutation of
//! one logical file is not coordinated.
//!
//! ---
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (pool lifecycle, attribute refreshes,
//! remote calls) and never installs a subscriber.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for configuration and value types, [`EntityExtJson`] |
//! | `http-client` | `UreqTransport`, registered for `http`/`https` by [`EntityFactory::with_defaults`] |

// Private modules
mod attrs;
mod backends;
mod buffer;
mod common;
mod config;
mod connection;
mod credentials;
mod error;
mod events;
mod ext;
mod factory;
mod filter;
mod interrupt;
mod layer;
mod location;
mod operation;
mod permissions;
mod proxy;
mod traits;
mod types;

// Public re-exports - model
pub use credentials::Credentials;
pub use error::FileError;
pub use location::{FILE_SCHEME, Location, Realm, default_port};
pub use operation::{FileOperation, OperationCategory};
pub use permissions::{
    ChangeablePermissions, FilePermissions, GroupedPermissionBits, PermissionAccess,
    PermissionBits, PermissionProbe, PermissionType, ProbedPermissionBits, permission_bit,
};
pub use types::{
    BackendKind, FileAttributes, InputStream, NativeHandle, OutputStream, RandomAccessInput,
    RandomAccessOutput,
};

// Public re-exports - capability contract
pub use traits::{
    EntityAttributes, EntityContent, EntityCore, EntityListing, EntityMutation, EntityNavigation,
    EntityRef, EntitySpace, FileEntity,
};

// Public re-exports - backend building blocks
pub use attrs::{AttributeSource, SyncedAttributes};
pub use common::{ParentSlot, ensure_same_volume, ls_filtered_via, topmost_ancestor};
pub use factory::{EntityFactory, EntityProvider};
pub use filter::{
    AndFilter, DirectoryFilter, EntityFilter, EntityFilterExt, ExtensionFilter, HiddenFilter,
    NotFilter, OrFilter,
};

// Public re-exports - backends
#[cfg(feature = "http-client")]
pub use backends::UreqTransport;
pub use backends::{
    HttpEntity, HttpError, HttpHead, HttpProvider, HttpTransport, LocalEntity, LocalProvider,
    S3Bucket, S3Client, S3Connection, S3ConnectionFactory, S3Connector, S3Entity, S3Error,
    S3Listing, S3Object, S3Pool, S3Provider, VIRT_SCHEME, VirtConnection, VirtConnectionFactory,
    VirtConnector, VirtDisk, VirtEntity, VirtError, VirtManager, VirtPool, VirtProvider,
    classify, extract_links, guess_directory, location_for_path, native_path,
};

// Public re-exports - infrastructure
pub use buffer::{BufferKind, BufferPool, DEFAULT_MAX_POOL_BYTES, PoolableBuffer, StoredBuffer};
pub use config::{ConnectionConfig, HttpConfig, RetryPolicy, VfsConfig};
pub use connection::{
    Connection, ConnectionFactory, ConnectionPool, HandlerState, PoolMonitor, PooledConnection,
    retry_with_policy,
};
pub use events::{ConnectionEvent, Subscribers, SubscriptionId};
pub use interrupt::{
    CHUNK_SIZE, CancelToken, InterruptibleReader, InterruptibleWriter, cancelled_error,
    copy_stream, is_cancelled_error,
};

// Public re-exports - decorators and extensions
pub use ext::EntityExt;
pub use layer::{CacheLayer, DelayLayer, Layer, LayerExt, ProxyLayer};
pub use proxy::{CachedEntity, DelayConfig, DelayMetrics, DelayedEntity, ProxyEntity};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::EntityExtJson;
