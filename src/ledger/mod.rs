// ============================================================================
// Update Ledger
// ============================================================================
//
// Generic model of the update ledger and the store collaborators that
// durably record update events.
// Query semantics (windows, ordering, projection) live in src/query/
//
// ============================================================================

mod core;
mod store;

pub use self::core::*;
pub use self::store::*;
