// ============================================================================
// Ledger Store - Update Event Persistence
// ============================================================================
//
// The store is an external collaborator of the query engine. It answers
// unordered, unpaginated range reads and current-state summary lookups.
//
// ============================================================================

pub mod memory;
pub mod scylla_store;
pub mod update_store;

pub use memory::{InMemoryUpdateStore, SeedFile, SeedSummary};
pub use scylla_store::ScyllaUpdateStore;
pub use update_store::{StoreError, UpdateEventStore};
