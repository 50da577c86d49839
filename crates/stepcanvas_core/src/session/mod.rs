//! Editing session lifecycle.
//!
//! # Responsibility
//! - Hold the single in-session copy of one Task as an explicit context
//!   object with defined open and close points.
//! - Route async collaborator results back into the session they were
//!   requested from, dropping stale ones.
//!
//! # Invariants
//! - At most one session is open per host.
//! - A result whose ticket does not match the open session and the latest
//!   outstanding request of its kind is discarded.

pub mod collaborators;
pub mod editor;
pub mod host;
