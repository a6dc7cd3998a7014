//! Physical projection and emission for the trestle engine.
//!
//! Takes the validated model plus a [`trestle_core::decisions::PolicyDecisionSet`]
//! and produces per-table DDL artifacts, the manifest, and an idempotent
//! write plan.

pub mod fingerprint;
pub mod manifest;
pub mod plan;
pub mod projection;
pub mod projector;
pub mod writer;
