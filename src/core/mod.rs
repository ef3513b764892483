//! Core business logic - framework-agnostic registry, registration, posto and grading
//! operations.
//!
//! Every function takes a `SeaORM` connection (or transaction) and returns the crate
//! [`Result`](crate::errors::Result). Invariant violations are raised before any write.

/// Grading and certificate numbering
pub mod grading;
/// Posto message board
pub mod message;
/// Authorization policy
pub mod policy;
/// Posto assignment engine
pub mod posto;
/// Registration workflow
pub mod registration;
/// Regions, fiscal years, waves and locations
pub mod registry;
/// Key-value bookkeeping
pub mod system_state;
/// Local user directory
pub mod user;
