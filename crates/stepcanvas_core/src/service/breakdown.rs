//! SubStep / ActionItem update operations.
//!
//! # Responsibility
//! - Add, update and remove tree nodes through whole-subtree replacement.
//! - Provide the flattened ActionItem projection for aggregate views.
//!
//! # Invariants
//! - Input values are never mutated; each call returns a new version.
//! - Untouched siblings are carried over unchanged.
//! - A missing SubStep/ActionItem id yields an unchanged copy.

use crate::config::EditorConfig;
use crate::model::identity::{IdGenerator, ACTION_ITEM_ID_PREFIX, SUB_STEP_ID_PREFIX};
use crate::model::task::{
    ActionItem, ActionItemReport, CanvasSize, ExtendedDetails, Position, SubStep, SubStepStatus,
};
use log::debug;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Partial update for one SubStep. `None` leaves a field untouched.
///
/// Nested options clear a field with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubStepPatch {
    pub text: Option<String>,
    pub notes: Option<Option<String>>,
    pub status: Option<SubStepStatus>,
    pub responsible: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub position: Option<Position>,
}

impl SubStepPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn status(status: SubStepStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    fn apply(&self, sub_step: &SubStep) -> SubStep {
        SubStep {
            id: sub_step.id.clone(),
            text: self.text.clone().unwrap_or_else(|| sub_step.text.clone()),
            notes: self.notes.clone().unwrap_or_else(|| sub_step.notes.clone()),
            status: self.status.unwrap_or(sub_step.status),
            responsible: self
                .responsible
                .clone()
                .unwrap_or_else(|| sub_step.responsible.clone()),
            due_date: self
                .due_date
                .clone()
                .unwrap_or_else(|| sub_step.due_date.clone()),
            position: self.position.unwrap_or(sub_step.position),
            action_items: sub_step.action_items.clone(),
        }
    }
}

/// Partial update for one ActionItem. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionItemPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub responsible: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub completed_date: Option<Option<String>>,
    pub report: Option<Option<ActionItemReport>>,
}

impl ActionItemPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Patch that overwrites every field except the identity.
    ///
    /// Used when an editor hands back a whole edited item.
    pub fn replace_with(item: &ActionItem) -> Self {
        Self {
            text: Some(item.text.clone()),
            completed: Some(item.completed),
            responsible: Some(item.responsible.clone()),
            due_date: Some(item.due_date.clone()),
            completed_date: Some(item.completed_date.clone()),
            report: Some(item.report.clone()),
        }
    }

    fn apply(&self, item: &ActionItem) -> ActionItem {
        ActionItem {
            id: item.id.clone(),
            text: self.text.clone().unwrap_or_else(|| item.text.clone()),
            completed: self.completed.unwrap_or(item.completed),
            responsible: self
                .responsible
                .clone()
                .unwrap_or_else(|| item.responsible.clone()),
            due_date: self.due_date.clone().unwrap_or_else(|| item.due_date.clone()),
            completed_date: self
                .completed_date
                .clone()
                .unwrap_or_else(|| item.completed_date.clone()),
            report: self.report.clone().unwrap_or_else(|| item.report.clone()),
        }
    }
}

/// Partial update for the Task-level text fields of `ExtendedDetails`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailsPatch {
    pub resources: Option<String>,
    pub responsible: Option<String>,
    pub notes: Option<String>,
    pub numerical_target: Option<Option<f64>>,
    pub due_date: Option<Option<String>>,
}

/// Rejected canvas resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSizeError {
    pub width: f64,
    pub height: f64,
}

impl Display for CanvasSizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "canvas size must be positive, got {}x{}",
            self.width, self.height
        )
    }
}

impl Error for CanvasSizeError {}

/// One ActionItem annotated with its owner names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenedActionItem<'a> {
    pub action_item: &'a ActionItem,
    pub sub_step_id: &'a str,
    pub sub_step_name: &'a str,
    pub task_name: &'a str,
}

/// Lazy SubStep-then-ActionItem walk over one details block.
///
/// Cloning the iterator restarts from the clone point without touching
/// the source.
#[derive(Debug, Clone)]
pub struct FlattenedActionItems<'a> {
    task_name: &'a str,
    sub_steps: std::slice::Iter<'a, SubStep>,
    current: Option<(&'a SubStep, std::slice::Iter<'a, ActionItem>)>,
}

impl<'a> Iterator for FlattenedActionItems<'a> {
    type Item = FlattenedActionItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((sub_step, items)) = self.current.as_mut() {
                let owner: &'a SubStep = *sub_step;
                if let Some(action_item) = items.next() {
                    return Some(FlattenedActionItem {
                        action_item,
                        sub_step_id: owner.id.as_str(),
                        sub_step_name: owner.text.as_str(),
                        task_name: self.task_name,
                    });
                }
            }
            let sub_step = self.sub_steps.next()?;
            self.current = Some((sub_step, sub_step.action_items.iter()));
        }
    }
}

/// Flattens every ActionItem of `details` in storage order.
pub fn flatten_action_items<'a>(
    details: &'a ExtendedDetails,
    task_name: &'a str,
) -> FlattenedActionItems<'a> {
    FlattenedActionItems {
        task_name,
        sub_steps: details.sub_steps.iter(),
        current: None,
    }
}

/// Default placement for the card appended after `count` existing cards.
pub fn stacked_position(count: usize, config: &EditorConfig) -> Position {
    Position::new(
        config.stack_origin_x,
        count as f64 * config.stack_step_y + config.stack_origin_y,
    )
}

/// Stateless service for breakdown tree edits.
#[derive(Debug, Clone, Default)]
pub struct BreakdownService {
    config: EditorConfig,
}

impl BreakdownService {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Appends a not-started SubStep stacked below the existing ones.
    ///
    /// Returns the new details and the created id.
    pub fn add_sub_step(
        &self,
        details: &ExtendedDetails,
        ids: &mut impl IdGenerator,
    ) -> (ExtendedDetails, String) {
        let id = ids.generate(SUB_STEP_ID_PREFIX);
        let position = stacked_position(details.sub_steps.len(), &self.config);
        let sub_step = SubStep::new(id.clone(), self.config.default_sub_step_text.clone(), position);

        let mut sub_steps = details.sub_steps.clone();
        sub_steps.push(sub_step);
        debug!(
            "event=substep_added module=breakdown status=ok substep_id={} count={}",
            id,
            sub_steps.len()
        );
        (details.with_sub_steps(sub_steps), id)
    }

    /// Replaces the patched fields of one SubStep.
    pub fn update_sub_step(
        &self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        patch: &SubStepPatch,
    ) -> ExtendedDetails {
        if details.sub_step(sub_step_id).is_none() {
            log_lookup_miss("update_substep", sub_step_id);
            return details.clone();
        }
        let sub_steps = details
            .sub_steps
            .iter()
            .map(|sub_step| {
                if sub_step.id == sub_step_id {
                    patch.apply(sub_step)
                } else {
                    sub_step.clone()
                }
            })
            .collect();
        details.with_sub_steps(sub_steps)
    }

    /// Deletes one SubStep together with its ActionItems.
    pub fn remove_sub_step(&self, details: &ExtendedDetails, sub_step_id: &str) -> ExtendedDetails {
        if details.sub_step(sub_step_id).is_none() {
            log_lookup_miss("remove_substep", sub_step_id);
            return details.clone();
        }
        let sub_steps: Vec<SubStep> = details
            .sub_steps
            .iter()
            .filter(|sub_step| sub_step.id != sub_step_id)
            .cloned()
            .collect();
        debug!(
            "event=substep_removed module=breakdown status=ok substep_id={} count={}",
            sub_step_id,
            sub_steps.len()
        );
        details.with_sub_steps(sub_steps)
    }

    /// Appends an open ActionItem to one SubStep.
    ///
    /// Returns `None` for the id when the SubStep does not exist; no
    /// identifier is consumed in that case.
    pub fn add_action_item(
        &self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        ids: &mut impl IdGenerator,
    ) -> (ExtendedDetails, Option<String>) {
        if details.sub_step(sub_step_id).is_none() {
            log_lookup_miss("add_action_item", sub_step_id);
            return (details.clone(), None);
        }
        let id = ids.generate(ACTION_ITEM_ID_PREFIX);
        let item = ActionItem::new(id.clone(), self.config.default_action_item_text.clone());
        let next = self.map_action_items(details, sub_step_id, |items| {
            let mut items = items.to_vec();
            items.push(item.clone());
            items
        });
        debug!(
            "event=action_item_added module=breakdown status=ok substep_id={} action_item_id={}",
            sub_step_id, id
        );
        (next, Some(id))
    }

    /// Replaces the patched fields of one ActionItem inside one SubStep.
    pub fn update_action_item(
        &self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        action_item_id: &str,
        patch: &ActionItemPatch,
    ) -> ExtendedDetails {
        if !owns_action_item(details, sub_step_id, action_item_id) {
            log_lookup_miss("update_action_item", action_item_id);
            return details.clone();
        }
        self.map_action_items(details, sub_step_id, |items| {
            items
                .iter()
                .map(|item| {
                    if item.id == action_item_id {
                        patch.apply(item)
                    } else {
                        item.clone()
                    }
                })
                .collect()
        })
    }

    /// Deletes one ActionItem from one SubStep.
    pub fn remove_action_item(
        &self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        action_item_id: &str,
    ) -> ExtendedDetails {
        if !owns_action_item(details, sub_step_id, action_item_id) {
            log_lookup_miss("remove_action_item", action_item_id);
            return details.clone();
        }
        self.map_action_items(details, sub_step_id, |items| {
            items
                .iter()
                .filter(|item| item.id != action_item_id)
                .cloned()
                .collect()
        })
    }

    /// Saves an edited ActionItem located by id alone.
    ///
    /// The owner is found with a Task-wide search, then the edit goes
    /// through `update_action_item`.
    pub fn update_action_item_report(
        &self,
        details: &ExtendedDetails,
        edited: &ActionItem,
    ) -> ExtendedDetails {
        match details.find_action_item(&edited.id) {
            Some((owner, _)) => {
                let owner_id = owner.id.clone();
                self.update_action_item(
                    details,
                    &owner_id,
                    &edited.id,
                    &ActionItemPatch::replace_with(edited),
                )
            }
            None => {
                log_lookup_miss("update_action_item_report", &edited.id);
                details.clone()
            }
        }
    }

    /// Replaces the patched Task-level fields.
    pub fn update_fields(&self, details: &ExtendedDetails, patch: &DetailsPatch) -> ExtendedDetails {
        let mut next = details.clone();
        if let Some(resources) = &patch.resources {
            next.resources = resources.clone();
        }
        if let Some(responsible) = &patch.responsible {
            next.responsible = responsible.clone();
        }
        if let Some(notes) = &patch.notes {
            next.notes = notes.clone();
        }
        if let Some(numerical_target) = patch.numerical_target {
            next.numerical_target = numerical_target;
        }
        if let Some(due_date) = &patch.due_date {
            next.due_date = due_date.clone();
        }
        next
    }

    /// Stores a slide deck verbatim.
    pub fn set_report_deck(&self, details: &ExtendedDetails, deck: Value) -> ExtendedDetails {
        let mut next = details.clone();
        next.report_deck = Some(deck);
        next
    }

    /// Replaces the decision list verbatim.
    pub fn set_decisions(&self, details: &ExtendedDetails, decisions: Vec<Value>) -> ExtendedDetails {
        let mut next = details.clone();
        next.decisions = decisions;
        next
    }

    /// Resizes the canvas. Stored card positions are left as they are.
    pub fn set_canvas_size(
        &self,
        details: &ExtendedDetails,
        width: f64,
        height: f64,
    ) -> Result<ExtendedDetails, CanvasSizeError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(CanvasSizeError { width, height });
        }
        let mut next = details.clone();
        next.sub_step_canvas_size = CanvasSize { width, height };
        Ok(next)
    }

    fn map_action_items(
        &self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        rebuild: impl Fn(&[ActionItem]) -> Vec<ActionItem>,
    ) -> ExtendedDetails {
        let sub_steps = details
            .sub_steps
            .iter()
            .map(|sub_step| {
                if sub_step.id == sub_step_id {
                    SubStep {
                        action_items: rebuild(&sub_step.action_items),
                        ..sub_step.clone()
                    }
                } else {
                    sub_step.clone()
                }
            })
            .collect();
        details.with_sub_steps(sub_steps)
    }
}

fn owns_action_item(details: &ExtendedDetails, sub_step_id: &str, action_item_id: &str) -> bool {
    details
        .sub_step(sub_step_id)
        .is_some_and(|sub_step| sub_step.contains_action_item(action_item_id))
}

fn log_lookup_miss(operation: &str, id: &str) {
    debug!(
        "event=lookup_miss module=breakdown status=noop operation={} id={}",
        operation, id
    );
}
