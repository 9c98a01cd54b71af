//! # Entity Factory
//!
//! Turns locations into entities.
//!
//! Each scheme maps to one [`EntityProvider`]. The factory parses the input,
//! looks up the provider for its scheme and hands it the [`Location`] plus
//! an optional [`NativeHandle`] the caller already resolved.
//!
//! | Scheme | Provider | Registered by |
//! |--------|----------|---------------|
//! | `file` | [`LocalProvider`](crate::LocalProvider) | [`EntityFactory::with_defaults`] |
//! | `http`, `https` | [`HttpProvider`](crate::HttpProvider) | `with_defaults` with the `http-client` feature |
//! | `s3` | [`S3Provider`](crate::S3Provider) | caller, with an [`S3Connector`](crate::S3Connector) |
//! | `virt` | [`VirtProvider`](crate::VirtProvider) | caller, with a [`VirtConnector`](crate::VirtConnector) |
//!
//! ```rust
//! use anyfile::EntityFactory;
//!
//! let factory = EntityFactory::with_defaults();
//! let tmp = factory.get("/tmp").unwrap();
//! assert_eq!(tmp.location().scheme(), "file");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{EntityRef, FileError, Location, NativeHandle};

/// Creates entities for one or more schemes.
pub trait EntityProvider: Send + Sync {
    /// Build the entity at `location`, reusing `handle` when it downcasts to
    /// the provider's native type.
    fn create(&self, location: Location, handle: Option<NativeHandle>) -> Result<EntityRef, FileError>;
}

impl<F> EntityProvider for F
where
    F: Fn(Location, Option<NativeHandle>) -> Result<EntityRef, FileError> + Send + Sync,
{
    fn create(&self, location: Location, handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        self(location, handle)
    }
}

/// Scheme-keyed provider registry.
#[derive(Default)]
pub struct EntityFactory {
    providers: RwLock<HashMap<String, Arc<dyn EntityProvider>>>,
}

impl EntityFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in providers.
    pub fn with_defaults() -> Self {
        let factory = Self::new();
        factory.register(crate::FILE_SCHEME, crate::LocalProvider);
        #[cfg(feature = "http-client")]
        {
            let provider = Arc::new(crate::HttpProvider::new(
                Arc::new(crate::UreqTransport::new(&crate::HttpConfig::default())),
                crate::VfsConfig::default().attribute_ttl,
            ));
            factory.register_shared("http", provider.clone());
            factory.register_shared("https", provider);
        }
        factory
    }

    /// Register `provider` for `scheme`, replacing any previous one.
    pub fn register(&self, scheme: &str, provider: impl EntityProvider + 'static) {
        self.register_shared(scheme, Arc::new(provider));
    }

    /// Register one shared provider instance, e.g. for several schemes.
    pub fn register_shared(&self, scheme: &str, provider: Arc<dyn EntityProvider>) {
        let scheme = scheme.to_ascii_lowercase();
        debug!(%scheme, "registering entity provider");
        self.providers.write().insert(scheme, provider);
    }

    /// Remove the provider for `scheme`. Returns `true` if one was registered.
    pub fn unregister(&self, scheme: &str) -> bool {
        self.providers
            .write()
            .remove(&scheme.to_ascii_lowercase())
            .is_some()
    }

    /// Returns `true` if a provider handles `scheme`.
    pub fn is_registered(&self, scheme: &str) -> bool {
        self.providers
            .read()
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Parse `input` and create its entity.
    ///
    /// # Errors
    ///
    /// [`FileError::InvalidLocation`] for unparseable input or an unknown
    /// scheme, otherwise whatever the provider reports.
    pub fn get(&self, input: &str) -> Result<EntityRef, FileError> {
        self.get_location(Location::parse(input)?)
    }

    /// Create the entity at `location`.
    pub fn get_location(&self, location: Location) -> Result<EntityRef, FileError> {
        self.create(location, None)
    }

    /// Create the entity at `location`, passing a pre-resolved native handle.
    pub fn get_with_handle(&self, location: Location, handle: NativeHandle) -> Result<EntityRef, FileError> {
        self.create(location, Some(handle))
    }

    fn create(&self, location: Location, handle: Option<NativeHandle>) -> Result<EntityRef, FileError> {
        let provider = self.providers.read().get(location.scheme()).cloned();
        match provider {
            Some(provider) => provider.create(location, handle),
            None => Err(FileError::InvalidLocation {
                input: location.to_string(),
                reason: format!("no provider for scheme {:?}", location.scheme()),
            }),
        }
    }
}

impl std::fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<String> = self.providers.read().keys().cloned().collect();
        schemes.sort();
        f.debug_struct("EntityFactory")
            .field("schemes", &schemes)
            .finish()
    }
}
