//! Shared types for the marketplace services
//!
//! Domain models, the unified error/response types and small time helpers
//! used by market-server and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
