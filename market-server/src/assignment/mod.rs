//! Shipper assignment: nearest-available offers with bounded retries

mod error;
pub mod geo;
mod scheduler;
mod worker;

pub use error::{AssignmentError, AssignmentResult};
pub use scheduler::{AssignmentScheduler, AttemptOutcome};
pub use worker::AssignmentWorker;
