//! Parent, root and volume navigation.

use crate::traits::{EntityCore, EntityRef};

/// Navigation between entities.
///
/// The parent is resolved lazily and cached. A listing sets it on every
/// child it returns so children never resolve it again.
pub trait EntityNavigation: EntityCore {
    /// The parent entity, `None` at the root.
    fn parent(&self) -> Option<EntityRef>;

    /// Override the cached parent.
    fn set_parent(&self, parent: Option<EntityRef>);

    /// The root of this entity's tree.
    fn root(&self) -> EntityRef;

    /// Whether this entity is its tree's root.
    fn is_root(&self) -> bool;

    /// The volume this entity lives on.
    ///
    /// Two entities can be renamed into each other only when their volumes
    /// have equal locations.
    fn volume(&self) -> EntityRef;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_navigation_is_object_safe() {
        fn _check(_: &dyn EntityNavigation) {}
    }
}
