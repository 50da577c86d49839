//! Work-breakdown domain model.
//!
//! # Responsibility
//! - Define the Task -> SubStep -> ActionItem tree and its sibling
//!   collections (attachments, decisions, report deck, canvas size).
//! - Define identity generation used whenever a node is created.
//!
//! # Invariants
//! - Identifiers are generated once and never re-derived or recycled.
//! - Storage order of `sub_steps` and `action_items` is insertion order.
//! - Attachments are immutable after creation.

pub mod identity;
pub mod task;
