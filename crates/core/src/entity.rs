//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities are persisted as whole snapshots; `revision` increases by one on
/// every committed write so readers can tell two snapshots of the same entity
/// apart.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Number of committed writes applied to this snapshot.
    fn revision(&self) -> u64;
}
