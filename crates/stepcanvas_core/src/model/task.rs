//! Task breakdown records.
//!
//! # Responsibility
//! - Define the canonical in-memory shape of one Task and its details.
//! - Keep the JSON wire shape exchanged with the editor shell stable.
//!
//! # Invariants
//! - `SubStep::position` is never negative on either axis.
//! - `ActionItemReport::attachments` is owned by its ActionItem and is
//!   unrelated to `ExtendedDetails::attachments`.
//! - `report_deck`, `resource_matrix` and `decisions` are opaque and
//!   round-trip verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Sub;
use std::sync::Arc;

/// SubStep identifier, unique within the owning Task.
pub type SubStepId = String;
/// ActionItem identifier, unique Task-wide.
pub type ActionItemId = String;
/// Attachment identifier.
pub type AttachmentId = String;

/// Default canvas width in pixels.
pub const DEFAULT_CANVAS_WIDTH: f64 = 1200.0;
/// Default canvas height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 800.0;

/// Progress state of one SubStep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubStepStatus {
    /// Created but not started.
    #[default]
    NotStarted,
    /// Work is in progress.
    InProgress,
    /// Finished.
    Completed,
}

/// Top-left placement of a card on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps both axes to the canvas lower bound `(0, 0)`.
    ///
    /// There is no upper bound: cards may extend past the canvas size.
    pub fn clamp_non_negative(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Bounding box of the free-placement SubStep canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

/// File attached to a Task or to an ActionItem report.
///
/// `data_url` holds the whole file inline. It is shared, never edited:
/// cloning an attachment does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    /// MIME type. Serialized as `type` to match the shell's schema.
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data_url: Arc<str>,
}

/// Completion report carried by one ActionItem.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItemReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Leaf of the breakdown tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: ActionItemId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    /// ISO date string (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// ISO date string (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ActionItemReport>,
}

impl ActionItem {
    /// Creates an open ActionItem with the given identity and text.
    pub fn new(id: impl Into<ActionItemId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            responsible: None,
            due_date: None,
            completed_date: None,
            report: None,
        }
    }
}

/// Decomposition node of a Task, placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub id: SubStepId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: SubStepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
}

impl SubStep {
    /// Creates a not-started SubStep with no action items.
    pub fn new(id: impl Into<SubStepId>, text: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            notes: None,
            status: SubStepStatus::NotStarted,
            responsible: None,
            due_date: None,
            position,
            action_items: Vec::new(),
        }
    }

    /// Returns whether this SubStep owns the given ActionItem.
    pub fn contains_action_item(&self, action_item_id: &str) -> bool {
        self.action_items.iter().any(|item| item.id == action_item_id)
    }
}

/// Elaboration block owned by one Task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedDetails {
    /// Display order is storage order.
    pub sub_steps: Vec<SubStep>,
    pub resources: String,
    pub responsible: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numerical_target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Slide deck produced and consumed by the report collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_deck: Option<Value>,
    pub resource_matrix: Option<Value>,
    pub attachments: Vec<Attachment>,
    pub decisions: Vec<Value>,
    pub sub_step_canvas_size: CanvasSize,
}

impl Default for ExtendedDetails {
    fn default() -> Self {
        Self {
            sub_steps: Vec::new(),
            resources: String::new(),
            responsible: String::new(),
            notes: String::new(),
            numerical_target: None,
            due_date: None,
            report_deck: None,
            resource_matrix: None,
            attachments: Vec::new(),
            decisions: Vec::new(),
            sub_step_canvas_size: CanvasSize::default(),
        }
    }
}

impl ExtendedDetails {
    /// Returns a copy of this block with `sub_steps` replaced.
    ///
    /// All other fields are carried over; attachment payloads are shared.
    pub fn with_sub_steps(&self, sub_steps: Vec<SubStep>) -> Self {
        Self {
            sub_steps,
            resources: self.resources.clone(),
            responsible: self.responsible.clone(),
            notes: self.notes.clone(),
            numerical_target: self.numerical_target,
            due_date: self.due_date.clone(),
            report_deck: self.report_deck.clone(),
            resource_matrix: self.resource_matrix.clone(),
            attachments: self.attachments.clone(),
            decisions: self.decisions.clone(),
            sub_step_canvas_size: self.sub_step_canvas_size,
        }
    }

    /// Finds one SubStep by id.
    pub fn sub_step(&self, sub_step_id: &str) -> Option<&SubStep> {
        self.sub_steps.iter().find(|sub_step| sub_step.id == sub_step_id)
    }

    /// Finds one ActionItem by id with a Task-wide search.
    ///
    /// Returns the owning SubStep together with the item.
    pub fn find_action_item(&self, action_item_id: &str) -> Option<(&SubStep, &ActionItem)> {
        self.sub_steps.iter().find_map(|sub_step| {
            sub_step
                .action_items
                .iter()
                .find(|item| item.id == action_item_id)
                .map(|item| (sub_step, item))
        })
    }

    /// Iterates every identifier present in this block.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        let tree = self.sub_steps.iter().flat_map(|sub_step| {
            std::iter::once(sub_step.id.as_str()).chain(sub_step.action_items.iter().flat_map(
                |item| {
                    std::iter::once(item.id.as_str()).chain(
                        item.report
                            .iter()
                            .flat_map(|report| report.attachments.iter())
                            .map(|attachment| attachment.id.as_str()),
                    )
                },
            ))
        });
        tree.chain(self.attachments.iter().map(|attachment| attachment.id.as_str()))
    }
}

/// Top-level unit of work being decomposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    /// `None` means the Task has not been elaborated yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_details: Option<ExtendedDetails>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: String::new(),
            extended_details: None,
        }
    }

    /// Returns the details to start editing from.
    pub fn details_or_default(&self) -> ExtendedDetails {
        self.extended_details.clone().unwrap_or_default()
    }
}
