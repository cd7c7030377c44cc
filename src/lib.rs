// ============================================================================
// Update Ledger - "What changed, when, and in how much detail"
// ============================================================================
//
// Layers, leaves first:
// - ledger:  update event model, pagination envelope, store collaborators
// - query:   time windows, ordering, pagination, token/digest projection
// - domain:  entity identifiers (calendars)
// - api:     HTTP adapter over the query service
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod metrics;
pub mod query;
pub mod utils;
