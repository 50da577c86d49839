//! SubStep canvas drag handling.
//!
//! # Responsibility
//! - Track the single active card drag as an explicit state machine.
//! - Translate pointer events into `update_sub_step` position edits.
//!
//! # Invariants
//! - At most one card is dragged at a time; a second press while dragging
//!   is ignored.
//! - Every move produces a position clamped to `x >= 0, y >= 0`.
//! - The viewport mode never rewrites stored positions.

use crate::model::task::{ExtendedDetails, Position, SubStepId};
use crate::service::breakdown::{BreakdownService, SubStepPatch};
use log::debug;

/// Canvas-level drag state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        sub_step_id: SubStepId,
        /// Grab point relative to the card's top-left corner.
        pointer_offset: Position,
    },
}

/// Drag state machine for one canvas.
#[derive(Debug, Clone, Default)]
pub struct CanvasLayout {
    state: DragState,
}

impl CanvasLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged_sub_step_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { sub_step_id, .. } => Some(sub_step_id.as_str()),
            DragState::Idle => None,
        }
    }

    /// `IDLE -> DRAGGING` on press over a card.
    ///
    /// Returns `false` and stays put when already dragging or when the
    /// card does not exist.
    pub fn press(
        &mut self,
        details: &ExtendedDetails,
        sub_step_id: &str,
        pointer: Position,
        canvas_origin: Position,
    ) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(sub_step) = details.sub_step(sub_step_id) else {
            return false;
        };
        let pointer_offset = pointer - canvas_origin - sub_step.position;
        self.state = DragState::Dragging {
            sub_step_id: sub_step.id.clone(),
            pointer_offset,
        };
        debug!(
            "event=drag_started module=canvas status=ok substep_id={}",
            sub_step_id
        );
        true
    }

    /// `DRAGGING -> DRAGGING` on pointer move.
    ///
    /// Returns the updated details, or `None` when idle.
    pub fn pointer_move(
        &self,
        service: &BreakdownService,
        details: &ExtendedDetails,
        pointer: Position,
        canvas_origin: Position,
    ) -> Option<ExtendedDetails> {
        let DragState::Dragging {
            sub_step_id,
            pointer_offset,
        } = &self.state
        else {
            return None;
        };
        let position = (pointer - canvas_origin - *pointer_offset).clamp_non_negative();
        Some(service.update_sub_step(details, sub_step_id, &SubStepPatch::position(position)))
    }

    /// `DRAGGING -> IDLE` on release, wherever the pointer is.
    pub fn release(&mut self) {
        if let DragState::Dragging { sub_step_id, .. } = &self.state {
            debug!(
                "event=drag_finished module=canvas status=ok substep_id={}",
                sub_step_id
            );
        }
        self.state = DragState::Idle;
    }
}

/// Presentation mode of the canvas. Only affects the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanvasViewport {
    expanded: bool,
}

impl CanvasViewport {
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
}
