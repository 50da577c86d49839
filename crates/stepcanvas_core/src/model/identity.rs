//! Identity generation for newly created nodes.
//!
//! # Responsibility
//! - Produce process-unique string identifiers from a category prefix.
//!
//! # Invariants
//! - A generator never returns the same identifier twice.
//! - After `reserve_existing(details)` a generator never returns an
//!   identifier already present in `details`.
//! - `SequentialIdGenerator` never wraps its counter. Once the numeric
//!   range is used up it issues `{prefix}-{uuid v4}` instead.

use crate::model::task::ExtendedDetails;
use log::warn;
use uuid::Uuid;

/// Prefix for SubStep identifiers.
pub const SUB_STEP_ID_PREFIX: &str = "substep";
/// Prefix for ActionItem identifiers.
pub const ACTION_ITEM_ID_PREFIX: &str = "action";
/// Prefix for Attachment identifiers.
pub const ATTACHMENT_ID_PREFIX: &str = "attach";

/// Source of fresh identifiers, called once per created entity.
pub trait IdGenerator {
    /// Returns a new identifier for the given category prefix.
    fn generate(&mut self, prefix: &str) -> String;

    /// Marks every identifier in `details` as taken.
    ///
    /// Called when an editor opens a document. Generators whose ids cannot
    /// collide with stored ones keep the default no-op.
    fn reserve_existing(&mut self, _details: &ExtendedDetails) {}
}

impl<G: IdGenerator + ?Sized> IdGenerator for &mut G {
    fn generate(&mut self, prefix: &str) -> String {
        (**self).generate(prefix)
    }

    fn reserve_existing(&mut self, details: &ExtendedDetails) {
        (**self).reserve_existing(details)
    }
}

/// Random identifiers shaped as `{prefix}-{uuid v4}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&mut self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// Deterministic identifiers shaped as `{prefix}-{n}`.
///
/// The counter is shared across prefixes, so `substep-3` and `action-3`
/// cannot both be issued.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    /// `None` once `u64::MAX` has been issued or found in a document.
    next: Option<u64>,
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialIdGenerator {
    /// Starts counting at 1.
    pub fn new() -> Self {
        Self { next: Some(1) }
    }

    /// Starts counting past the largest numeric suffix found in `details`.
    pub fn resume_after(details: &ExtendedDetails) -> Self {
        let mut ids = Self::new();
        ids.reserve_existing(details);
        ids
    }

    /// Whether numeric suffixes are used up.
    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&mut self, prefix: &str) -> String {
        match self.next {
            Some(current) => {
                self.next = current.checked_add(1);
                format!("{prefix}-{current}")
            }
            None => {
                warn!("event=id_counter_exhausted module=identity status=fallback prefix={prefix}");
                format!("{prefix}-{}", Uuid::new_v4())
            }
        }
    }

    fn reserve_existing(&mut self, details: &ExtendedDetails) {
        let Some(highest) = details
            .identifiers()
            .filter_map(|id| id.rsplit_once('-'))
            .filter_map(|(_, suffix)| suffix.parse::<u64>().ok())
            .max()
        else {
            return;
        };
        let floor = highest.checked_add(1);
        self.next = match (self.next, floor) {
            (Some(next), Some(floor)) => Some(next.max(floor)),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
    use crate::model::task::{ExtendedDetails, Position, SubStep};

    #[test]
    fn sequential_ids_share_one_counter() {
        let mut ids = SequentialIdGenerator::new();
        assert_eq!(ids.generate("substep"), "substep-1");
        assert_eq!(ids.generate("action"), "action-2");
    }

    #[test]
    fn resume_after_skips_existing_suffixes() {
        let details = ExtendedDetails::default().with_sub_steps(vec![
            SubStep::new("substep-7", "a", Position::default()),
            SubStep::new("substep-imported", "b", Position::default()),
        ]);
        let mut ids = SequentialIdGenerator::resume_after(&details);
        assert_eq!(ids.generate("substep"), "substep-8");
    }

    #[test]
    fn resume_after_maximum_suffix_never_reissues_it() {
        let taken = format!("substep-{}", u64::MAX);
        let details = ExtendedDetails::default().with_sub_steps(vec![
            SubStep::new(taken.as_str(), "a", Position::default()),
            SubStep::new("substep-3", "b", Position::default()),
        ]);
        let mut ids = SequentialIdGenerator::resume_after(&details);
        assert!(ids.is_exhausted());

        let first = ids.generate("substep");
        let second = ids.generate("substep");
        assert_ne!(first, taken);
        assert!(first.starts_with("substep-"));
        assert_ne!(first, second);
    }

    #[test]
    fn counter_stops_after_issuing_the_last_number() {
        let almost = format!("action-{}", u64::MAX - 1);
        let details = ExtendedDetails::default().with_sub_steps(vec![SubStep::new(
            almost.as_str(),
            "a",
            Position::default(),
        )]);
        let mut ids = SequentialIdGenerator::resume_after(&details);
        assert_eq!(ids.generate("action"), format!("action-{}", u64::MAX));
        assert!(ids.is_exhausted());
        assert_ne!(ids.generate("action"), format!("action-{}", u64::MAX));
    }

    #[test]
    fn reserve_existing_only_moves_forward() {
        let details = ExtendedDetails::default().with_sub_steps(vec![SubStep::new(
            "substep-2",
            "a",
            Position::default(),
        )]);
        let mut ids = SequentialIdGenerator::new();
        for _ in 0..5 {
            ids.generate("action");
        }
        ids.reserve_existing(&details);
        assert_eq!(ids.generate("substep"), "substep-6");
    }

    #[test]
    fn uuid_ids_carry_prefix_and_differ() {
        let mut ids = UuidIdGenerator;
        let first = ids.generate("attach");
        let second = ids.generate("attach");
        assert!(first.starts_with("attach-"));
        assert_ne!(first, second);
    }
}
