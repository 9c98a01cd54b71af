//! # Layer Trait
//!
//! Tower-style composition of entity decorators.
//!
//! ## How It Works
//!
//! ```text
//! EntityRef ──▶ Layer::layer() ──▶ decorated EntityRef
//! ```
//!
//! A layer holds a decorator's configuration; applying it wraps an entity.
//! [`LayerExt`] chains layers fluently:
//!
//! ```rust
//! use std::time::Duration;
//! use anyfile::{CacheLayer, DelayConfig, DelayLayer, EntityRef, LayerExt, LocalEntity};
//!
//! let entity: EntityRef = LocalEntity::new("/tmp");
//! let entity = entity
//!     .layer(DelayLayer::new(DelayConfig::uniform(Duration::from_millis(1))))
//!     .layer(CacheLayer::recursive());
//! assert!(entity.exists());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{CachedEntity, DelayConfig, DelayMetrics, DelayedEntity, EntityRef, ProxyEntity};

/// Wraps an entity to add functionality.
///
/// `layer(self, entity)` consumes the layer configuration. Layers that are
/// applied to many entities are cheap to clone.
pub trait Layer<E> {
    /// The decorated entity type.
    type Entity;

    /// Wrap `entity`.
    fn layer(self, entity: E) -> Self::Entity;
}

/// Fluent `.layer()` on entity references.
pub trait LayerExt: Sized {
    /// Apply a layer.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Entity {
        layer.layer(self)
    }
}

impl LayerExt for EntityRef {}

/// Applies [`ProxyEntity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyLayer;

impl Layer<EntityRef> for ProxyLayer {
    type Entity = EntityRef;

    fn layer(self, entity: EntityRef) -> EntityRef {
        Arc::new(ProxyEntity::new(entity))
    }
}

/// Applies [`CachedEntity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheLayer {
    recursive: bool,
}

impl CacheLayer {
    /// Cache the wrapped entity only.
    pub fn shallow() -> Self {
        Self { recursive: false }
    }

    /// Cache the wrapped entity and everything reached through it.
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

impl Layer<EntityRef> for CacheLayer {
    type Entity = EntityRef;

    fn layer(self, entity: EntityRef) -> EntityRef {
        CachedEntity::wrap(entity, self.recursive)
    }
}

/// Applies [`DelayedEntity`].
#[derive(Clone, Default)]
pub struct DelayLayer {
    config: DelayConfig,
    metrics: Arc<Mutex<DelayMetrics>>,
}

impl DelayLayer {
    /// A layer with fresh metrics.
    pub fn new(config: DelayConfig) -> Self {
        Self {
            config,
            metrics: Arc::default(),
        }
    }

    /// Metrics shared by every entity this layer wraps.
    pub fn metrics(&self) -> Arc<Mutex<DelayMetrics>> {
        Arc::clone(&self.metrics)
    }
}

impl Layer<EntityRef> for DelayLayer {
    type Entity = EntityRef;

    fn layer(self, entity: EntityRef) -> EntityRef {
        Arc::new(DelayedEntity::with_metrics(entity, self.config, self.metrics))
    }
}
