//! Work-breakdown editing engine.
//!
//! # Responsibility
//! - Express every edit as a pure transformation from one
//!   `ExtendedDetails` value to the next.
//! - Merge generated proposals, track canvas drags and order table views
//!   without touching storage order.
//!
//! # Invariants
//! - Lookup misses are silent no-ops that return an unchanged value.
//! - Sorting and flattening never reorder stored sequences.

pub mod attachment;
pub mod breakdown;
pub mod canvas;
pub mod reconciler;
pub mod sort;
