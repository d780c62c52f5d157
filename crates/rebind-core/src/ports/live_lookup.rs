use crate::domain::{EntityType, LiveObject, ObjectId};

/// Read access to the already-materialized graph.
///
/// Passed explicitly into every Recoverer call so parent lookups never go
/// through ambient state.
pub trait LiveLookup {
    /// The live object with `id`, if it exists and has `entity_type`.
    fn lookup_live(&self, entity_type: &EntityType, id: ObjectId) -> Option<LiveObject>;
}
