//! # Backends
//!
//! Concrete file entities.
//!
//! | Backend | Scheme | Kind | Wire boundary |
//! |---------|--------|------|---------------|
//! | [`LocalEntity`] | `file` | [`BackendKind::Local`](crate::BackendKind::Local) | `std::fs` |
//! | [`HttpEntity`] | `http`, `https` | [`BackendKind::Http`](crate::BackendKind::Http) | [`HttpTransport`] |
//! | [`S3Entity`] | `s3` | [`BackendKind::S3`](crate::BackendKind::S3) | [`S3Connector`] / [`S3Client`] |
//! | [`VirtEntity`] | `virt` | [`BackendKind::Virt`](crate::BackendKind::Virt) | [`VirtConnector`] / [`VirtManager`] |
//!
//! Remote backends keep their attributes in a
//! [`SyncedAttributes`](crate::SyncedAttributes) snapshot, and the
//! session-based ones (S3, virt) go through a
//! [`ConnectionPool`](crate::ConnectionPool). Wire SDK errors are translated
//! at this boundary by each backend's `into_file_error`.

mod http;
#[cfg(feature = "http-client")]
mod http_ureq;
mod local;
mod s3;
mod virt;

pub use http::{
    HttpEntity, HttpError, HttpHead, HttpProvider, HttpTransport, classify, extract_links,
    guess_directory,
};
#[cfg(feature = "http-client")]
pub use http_ureq::UreqTransport;
pub use local::{LocalEntity, LocalProvider, location_for_path, native_path};
pub use s3::{
    S3Bucket, S3Client, S3Connection, S3ConnectionFactory, S3Connector, S3Entity, S3Error,
    S3Listing, S3Object, S3Pool, S3Provider,
};
pub use virt::{
    VIRT_SCHEME, VirtConnection, VirtConnectionFactory, VirtConnector, VirtDisk, VirtEntity,
    VirtError, VirtManager, VirtPool, VirtProvider,
};
