//! # Entity Decorators
//!
//! Wrappers that stand in for any [`FileEntity`](crate::FileEntity) and add
//! behaviour around it.
//!
//! | Decorator | Behaviour |
//! |-----------|-----------|
//! | [`ProxyEntity`] | forwards every operation unchanged |
//! | [`CachedEntity`] | memoizes getters, optionally for a whole subtree |
//! | [`DelayedEntity`] | sleeps before each operation and counts calls |
//!
//! Each decorator implements every component trait explicitly. None of the
//! traits has default methods, so a decorator missing an operation fails to
//! compile instead of silently skipping the wrapped entity.
//!
//! ```rust
//! use std::sync::Arc;
//! use anyfile::{CachedEntity, EntityRef, LocalEntity};
//!
//! let dir: EntityRef = LocalEntity::new("/tmp");
//! let snapshot = CachedEntity::wrap(dir, true);
//! let first = snapshot.exists();
//! assert_eq!(snapshot.exists(), first);
//! ```

mod cached;
mod delay;
mod forward;

pub use cached::CachedEntity;
pub use delay::{DelayConfig, DelayMetrics, DelayedEntity};
pub use forward::ProxyEntity;
