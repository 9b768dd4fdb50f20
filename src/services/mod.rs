//! Application services.
//!
//! Orchestration between the HTTP handlers, the item store and the pure
//! scheduling core in `srs`.

pub mod review;

pub use review::{load_queue, submit_grade, ServiceError, MAX_CONFLICT_RETRIES};
