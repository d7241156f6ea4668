//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An appointment is an entity: its status and notes change over time but it
/// remains the same visit as long as its id is the same.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
