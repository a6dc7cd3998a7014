//! Core types for the trestle emission engine.
//!
//! This crate contains the logical model, the profiling snapshot, the policy
//! decision records, and the low-level emission helpers (identifier quoting,
//! naming overrides, SQL type resolution, literal formatting) shared by the
//! policy, projection, and seeding crates.

pub mod decisions;
pub mod error;
pub mod identifier;
pub mod index;
pub mod literal;
pub mod model;
pub mod overrides;
pub mod profile;
pub mod types;
pub mod validation;
