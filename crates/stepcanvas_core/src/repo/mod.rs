//! Persistence boundary.
//!
//! # Responsibility
//! - Define the two save operations the editor calls on confirmation.
//! - Provide an in-memory implementation for tests and tooling.
//!
//! # Invariants
//! - There is no autosave and no partial save of `ExtendedDetails`.

pub mod task_store;
