//! # Connection Pooling
//!
//! Remote backends amortize session setup per [`Realm`] through a
//! [`ConnectionPool`]. A backend supplies a [`ConnectionFactory`] producing
//! [`Connection`]s; the pool decides when they are created, connected,
//! shared, re-validated and destroyed.
//!
//! ## Handler Lifecycle
//!
//! ```text
//! Idle ──connect──► Connecting ──ok──► Connected ──close/prune/shutdown──► Closed
//!                       │                  │
//!                       └──error──► Closed └──dropped──► (one reconnect on check)
//! ```
//!
//! | Acquire mode | Sharing | On release |
//! |--------------|---------|------------|
//! | non-exclusive | one handler per realm, shared by all users | stays pooled, idle |
//! | exclusive | dedicated handler | destroyed |
//!
//! At most one handler per realm is ever in the `Connecting` state: every
//! connect and reconnect for a realm runs under that realm's connect lock.

mod pool;
mod retry;

pub use pool::{ConnectionPool, PoolMonitor, PooledConnection};
pub use retry::retry_with_policy;

use crate::{FileError, Realm};

/// A session with one realm.
///
/// Methods take `&self`: a connected handler may be used from several
/// threads at once. Protocols that need serialized request/response
/// exchanges must serialize inside the connection.
pub trait Connection: Send + Sync + 'static {
    /// Establish the session. Authentication failures must surface as
    /// [`FileError::AuthenticationRequired`].
    fn connect(&self) -> Result<(), FileError>;

    /// Whether the session is currently usable.
    fn is_connected(&self) -> bool;

    /// Tear the session down. Idempotent.
    fn disconnect(&self);

    /// Keep an idle session from timing out.
    ///
    /// A no-op for protocols without idle disconnects.
    fn keep_alive(&self) -> Result<(), FileError> {
        Ok(())
    }
}

/// Creates unconnected sessions for a realm.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The session type.
    type Connection: Connection;

    /// Create a session bound to `realm`. Must not connect yet.
    fn create(&self, realm: &Realm) -> Result<Self::Connection, FileError>;
}

/// Lifecycle state of a pooled handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerState {
    /// Created, not connected yet.
    Idle,
    /// Inside the realm's connect critical section.
    Connecting,
    /// Session established.
    Connected,
    /// Destroyed; never reused.
    Closed,
}
