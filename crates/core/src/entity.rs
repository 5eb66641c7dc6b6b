//! Entity trait: identity + continuity across state changes.

/// A record whose identity survives edits.
///
/// Inventory items, recipes and customers are all entities: two records with the
/// same id are the same thing even when every other field differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
