//! The policy decider: turns model + profile + options into per-column,
//! per-index, and per-foreign-key tightening decisions.

pub mod decider;

pub use decider::decide;
