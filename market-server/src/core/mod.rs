//! Configuration, shared state, background tasks and the HTTP server
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - service handles shared by handlers and workers
//! - [`Server`] - HTTP server
//! - [`BackgroundTasks`] - supervision of long-running loops
//! - [`ServerError`] - process-level errors

pub mod config;
pub mod error;
pub mod event_router;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, FulfillmentConfig};
pub use error::{Result, ServerError};
pub use event_router::{EventChannels, EventRouter};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
