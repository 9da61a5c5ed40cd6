//! Entities are compared by identity, not by their current attribute values.

/// A domain object with a stable identifier.
///
/// Two snapshots of the same product taken before and after a stock update are
/// different values but the same entity.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// True when both values refer to the same entity, regardless of state.
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
