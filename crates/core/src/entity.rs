//! Entity trait: identity + continuity across state changes.
//!
//! Entities that live *inside* an aggregate (e.g. a child row with its own
//! small lifecycle) implement this; they are addressable only through their
//! owning aggregate, never independently.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
