//! Order lifecycle
//!
//! - [`OrdersManager`]: creation with stock reservation, transitions,
//!   shipper acceptance, consultation quotes
//! - [`machine`]: the transition table every status change is checked against
//! - [`OrderEvent`]: broadcast after each committed change

mod error;
mod event;
pub mod machine;
mod manager;

pub use error::{OrderError, OrderResult};
pub use event::{OrderEvent, OrderEventKind};
pub use machine::{Actor, ActorRole};
pub use manager::{OrdersManager, validate_sale_time};
