// ============================================================================
// Ledger Core - Generic Update Model
// ============================================================================
//
// Key Principles:
// - No entity-specific code (no Calendar, Agenda, Bill, etc.)
// - Generic over the entity identifier type
// - Read-only views over the store; nothing here persists
//
// ============================================================================

pub mod event;
pub mod interval;
pub mod page;

pub use event::{
    EntityId, Summary, UnknownVariant, UpdateDigest, UpdateEvent, UpdateRecord, UpdateToken,
    UpdateType,
};
pub use interval::{InvalidInterval, SortOrder, TimeInterval};
pub use page::{ConsistencyError, LimitOffset, Page};
