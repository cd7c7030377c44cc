// ============================================================================
// Domain Layer - Entity Identifiers
// ============================================================================
//
// Each versioned entity type tracked by the ledger has its own identifier
// here. The ledger and query engine are generic over these identifiers.
//
// ============================================================================

pub mod calendar;

pub use calendar::CalendarId;
