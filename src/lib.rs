//! Availability & booking resolution service
//!
//! This library turns recurring weekly availability windows into offerable
//! time slots and commits bookings against them with a mutual-exclusion
//! guarantee: no two invitees can ever claim overlapping time.
//!
//! # Modules
//!
//! - `services::slots`: pure, timezone-aware slot generation
//! - `services::ledger`: the authoritative meeting store with a serialized
//!   check-then-insert
//! - `services::catalog`: event types and availability rules
//! - `services::booking`: orchestration of generation, conflict filtering
//!   and the booking commit
//! - `handlers` / `routes`: the HTTP surface

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

// Re-export the main types for ease of use
pub use error::ServiceError;
pub use handlers::api::AppState;
pub use routes::create_router;
