//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

/// Entity marker + minimal interface.
///
/// Every persisted document is an entity living in one named collection.
pub trait Entity: Clone + core::fmt::Debug {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Into<Uuid>;

    /// Name of the collection the entity is stored in.
    const COLLECTION: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
