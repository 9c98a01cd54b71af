//! Listing filters.
//!
//! Any `Fn(&dyn FileEntity) -> bool + Send + Sync` closure is a filter; the
//! named filters below cover the common cases and compose with
//! [`EntityFilterExt`].
//!
//! ```rust
//! use anyfile::{DirectoryFilter, EntityFilterExt, ExtensionFilter};
//!
//! // Directories, plus .rs files
//! let filter = DirectoryFilter.or(ExtensionFilter::new(["rs"]));
//! # let _ = filter;
//! ```

use crate::FileEntity;

/// Decides whether a listed entity is kept.
pub trait EntityFilter: Send + Sync {
    /// Returns `true` to keep `entity`.
    fn accept(&self, entity: &dyn FileEntity) -> bool;

    /// Keep only accepted entities.
    fn filter_entities(&self, entities: Vec<crate::EntityRef>) -> Vec<crate::EntityRef> {
        entities
            .into_iter()
            .filter(|entity| self.accept(entity.as_ref()))
            .collect()
    }
}

impl<F> EntityFilter for F
where
    F: Fn(&dyn FileEntity) -> bool + Send + Sync,
{
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        self(entity)
    }
}

/// Accepts entities whose extension is in a set (case-insensitive).
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Create from extensions without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl EntityFilter for ExtensionFilter {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        entity
            .location()
            .extension()
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Rejects hidden entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenFilter;

impl EntityFilter for HiddenFilter {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        !entity.is_hidden()
    }
}

/// Accepts directories only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFilter;

impl EntityFilter for DirectoryFilter {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        entity.is_directory()
    }
}

/// Both filters must accept.
pub struct AndFilter<A, B>(A, B);

impl<A: EntityFilter, B: EntityFilter> EntityFilter for AndFilter<A, B> {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        self.0.accept(entity) && self.1.accept(entity)
    }
}

/// Either filter must accept.
pub struct OrFilter<A, B>(A, B);

impl<A: EntityFilter, B: EntityFilter> EntityFilter for OrFilter<A, B> {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        self.0.accept(entity) || self.1.accept(entity)
    }
}

/// Inverts a filter.
pub struct NotFilter<A>(A);

impl<A: EntityFilter> EntityFilter for NotFilter<A> {
    fn accept(&self, entity: &dyn FileEntity) -> bool {
        !self.0.accept(entity)
    }
}

/// Combinators for filters.
pub trait EntityFilterExt: EntityFilter + Sized {
    /// Accept when both accept.
    fn and<B: EntityFilter>(self, other: B) -> AndFilter<Self, B> {
        AndFilter(self, other)
    }

    /// Accept when either accepts.
    fn or<B: EntityFilter>(self, other: B) -> OrFilter<Self, B> {
        OrFilter(self, other)
    }

    /// Accept when this filter rejects.
    fn not(self) -> NotFilter<Self> {
        NotFilter(self)
    }
}

impl<F: EntityFilter> EntityFilterExt for F {}
