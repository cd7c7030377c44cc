// ============================================================================
// HTTP API - Transport Adapter over the Update Service
// ============================================================================

pub mod response;
pub mod routes;
pub mod server;

pub use response::{ApiError, ListViewResponse};
pub use server::{configure, serve};
