//! Entity trait: records identified by a store-assigned id.

/// A record the backing store has accepted.
///
/// Drafts that have not been assigned an id yet are plain payloads, not entities.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

/// Replace the record with the same id, or append it. Returns `true` on replace.
pub fn upsert<T: Entity>(records: &mut Vec<T>, record: T) -> bool {
    match records.iter_mut().find(|r| r.id() == record.id()) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    }
}
