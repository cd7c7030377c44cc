// ============================================================================
// Update Query - Windows, Ordering, Pagination, Projection
// ============================================================================
//
// Control flow of every request:
//
//   caller -> TimeRangeResolver -> UpdateQueryEngine (store read)
//          -> ResultProjector -> Page
//
// ============================================================================

pub mod clock;
pub mod engine;
pub mod errors;
pub mod params;
pub mod projector;
pub mod service;
pub mod time_range;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{sort_events, UpdateQueryEngine};
pub use errors::UpdateQueryError;
pub use params::{UpdateQueryParams, DEFAULT_LIMIT};
pub use projector::ResultProjector;
pub use service::UpdateService;
pub use time_range::{long_ago, parse_timestamp, the_future, TimeRangeResolver, WindowPolicy};
