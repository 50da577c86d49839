//! Proposal reconciliation.
//!
//! # Responsibility
//! - Merge a batch of generated SubStep/ActionItem proposals into the
//!   breakdown tree without touching pre-existing nodes.
//!
//! # Invariants
//! - Pass 1 materializes every proposed SubStep and records a
//!   proposal-reference -> new-identity table.
//! - Pass 2 resolves ActionItem targets only through that table; existing
//!   SubSteps are never merge targets.
//! - Unresolved ActionItem proposals are dropped, never reported as errors.

use crate::config::EditorConfig;
use crate::model::identity::{IdGenerator, ACTION_ITEM_ID_PREFIX, SUB_STEP_ID_PREFIX};
use crate::model::task::{ActionItem, ExtendedDetails, SubStep, SubStepStatus};
use crate::service::breakdown::stacked_position;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generated SubStep candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedSubStep {
    /// Batch-local key that ActionItem proposals use as
    /// `target_sub_step_id`. Defaults to the proposal's batch index
    /// (`"0"`, `"1"`, ...) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Generated ActionItem candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedActionItem {
    pub target_sub_step_id: String,
    pub title: String,
}

/// One generator response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalBatch {
    #[serde(default)]
    pub sub_steps: Vec<ProposedSubStep>,
    #[serde(default)]
    pub action_items: Vec<ProposedActionItem>,
}

impl ProposalBatch {
    pub fn is_empty(&self) -> bool {
        self.sub_steps.is_empty() && self.action_items.is_empty()
    }
}

/// Merge result.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub details: ExtendedDetails,
    /// Ids of the created SubSteps, in batch order.
    pub created_sub_step_ids: Vec<String>,
    /// Ids of the created ActionItems, in batch order.
    pub created_action_item_ids: Vec<String>,
    /// Number of ActionItem proposals whose target did not resolve.
    pub dropped_action_items: usize,
}

/// Proposal-reference -> batch index -> generated identity.
struct Correspondence<'a> {
    by_reference: HashMap<&'a str, usize>,
}

impl<'a> Correspondence<'a> {
    fn build(proposals: &'a [ProposedSubStep], index_keys: &'a [String]) -> Self {
        let mut by_reference = HashMap::with_capacity(proposals.len());
        for (index, proposal) in proposals.iter().enumerate() {
            let key = proposal
                .reference
                .as_deref()
                .unwrap_or(index_keys[index].as_str());
            by_reference.entry(key).or_insert(index);
        }
        Self { by_reference }
    }

    fn resolve(&self, target: &str) -> Option<usize> {
        self.by_reference.get(target).copied()
    }
}

/// Merges `batch` into `details`.
pub fn reconcile(
    details: &ExtendedDetails,
    batch: &ProposalBatch,
    ids: &mut impl IdGenerator,
    config: &EditorConfig,
) -> ReconcileOutcome {
    // Pass 1: materialize SubSteps, continuing the stacking offset.
    let existing = details.sub_steps.len();
    let mut created: Vec<SubStep> = batch
        .sub_steps
        .iter()
        .enumerate()
        .map(|(offset, proposal)| SubStep {
            notes: Some(proposal.description.clone()),
            status: SubStepStatus::NotStarted,
            ..SubStep::new(
                ids.generate(SUB_STEP_ID_PREFIX),
                proposal.title.clone(),
                stacked_position(existing + offset, config),
            )
        })
        .collect();
    let index_keys: Vec<String> = (0..batch.sub_steps.len()).map(|i| i.to_string()).collect();
    let table = Correspondence::build(&batch.sub_steps, &index_keys);

    // Pass 2: resolve ActionItem targets through the table.
    let mut created_action_item_ids = Vec::new();
    let mut dropped_action_items = 0;
    for proposal in &batch.action_items {
        match table.resolve(&proposal.target_sub_step_id) {
            Some(index) => {
                let id = ids.generate(ACTION_ITEM_ID_PREFIX);
                created[index]
                    .action_items
                    .push(ActionItem::new(id.clone(), proposal.title.clone()));
                created_action_item_ids.push(id);
            }
            None => {
                dropped_action_items += 1;
                debug!(
                    "event=proposal_dropped module=reconciler status=noop reason=unresolved_target"
                );
            }
        }
    }

    let created_sub_step_ids = created.iter().map(|sub_step| sub_step.id.clone()).collect();
    let mut sub_steps = details.sub_steps.clone();
    sub_steps.extend(created);

    info!(
        "event=proposals_reconciled module=reconciler status=ok substeps_added={} action_items_added={} dropped={}",
        batch.sub_steps.len(),
        created_action_item_ids.len(),
        dropped_action_items
    );

    ReconcileOutcome {
        details: details.with_sub_steps(sub_steps),
        created_sub_step_ids,
        created_action_item_ids,
        dropped_action_items,
    }
}

#[cfg(test)]
mod tests {
    use super::{reconcile, ProposalBatch, ProposedActionItem, ProposedSubStep};
    use crate::config::EditorConfig;
    use crate::model::identity::SequentialIdGenerator;
    use crate::model::task::ExtendedDetails;

    fn sub_step(reference: Option<&str>, title: &str) -> ProposedSubStep {
        ProposedSubStep {
            reference: reference.map(str::to_string),
            title: title.to_string(),
            description: format!("{title} details"),
        }
    }

    fn action_item(target: &str, title: &str) -> ProposedActionItem {
        ProposedActionItem {
            target_sub_step_id: target.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn index_keys_resolve_when_reference_is_absent() {
        let batch = ProposalBatch {
            sub_steps: vec![sub_step(None, "Plan"), sub_step(None, "Build")],
            action_items: vec![action_item("1", "Write code")],
        };
        let mut ids = SequentialIdGenerator::new();
        let outcome = reconcile(
            &ExtendedDetails::default(),
            &batch,
            &mut ids,
            &EditorConfig::default(),
        );

        assert_eq!(outcome.details.sub_steps[0].action_items.len(), 0);
        assert_eq!(outcome.details.sub_steps[1].action_items[0].text, "Write code");
        assert_eq!(outcome.dropped_action_items, 0);
    }

    #[test]
    fn duplicate_reference_binds_to_first_proposal() {
        let batch = ProposalBatch {
            sub_steps: vec![sub_step(Some("dup"), "A"), sub_step(Some("dup"), "B")],
            action_items: vec![action_item("dup", "x")],
        };
        let mut ids = SequentialIdGenerator::new();
        let outcome = reconcile(
            &ExtendedDetails::default(),
            &batch,
            &mut ids,
            &EditorConfig::default(),
        );

        assert_eq!(outcome.details.sub_steps[0].action_items.len(), 1);
        assert!(outcome.details.sub_steps[1].action_items.is_empty());
    }
}
