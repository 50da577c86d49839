//! Editor session context.
//!
//! # Responsibility
//! - Own the working copy of one Task while it is being edited.
//! - Apply every edit by swapping in the next `ExtendedDetails` version.
//! - Hold per-session UI state the core cares about: drag state, viewport
//!   mode, queued file reads, held error banners and proposals under review.
//!
//! # Invariants
//! - Nothing is written to the store until `save`.
//! - Attachment reads run one at a time in arrival order.
//! - Starting a request supersedes any outstanding request of that kind.

use crate::model::identity::IdGenerator;
use crate::model::task::{ActionItem, ExtendedDetails, Position, Task};
use crate::repo::task_store::{PersistenceError, TaskCoreUpdate, TaskStore};
use crate::service::attachment::{AttachmentError, AttachmentQueue, FileBlob, FileIngestor};
use crate::service::breakdown::{
    flatten_action_items, ActionItemPatch, BreakdownService, CanvasSizeError, DetailsPatch,
    FlattenedActionItems, SubStepPatch,
};
use crate::service::canvas::{CanvasLayout, CanvasViewport};
use crate::service::reconciler::{reconcile, ProposalBatch, ReconcileOutcome};
use crate::service::sort::{ActionItemTable, TableScope};
use crate::session::collaborators::{GenerationError, RequestKind};
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Handle for one outstanding collaborator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub session_epoch: u64,
    pub sequence: u64,
    pub kind: RequestKind,
}

/// What happened to a delivered collaborator result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Result was applied to the session.
    Applied,
    /// Request failed; the banner message is now held.
    ErrorHeld,
    /// Ticket belongs to a closed session or a superseded request.
    DroppedStale,
}

/// Result of asking for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportRequest {
    /// A deck already exists; the report editor is open.
    Ready,
    /// Generation must run; deliver its result with this ticket.
    Generate(RequestTicket),
}

/// Outcome of draining the attachment read queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentReadReport {
    pub added: Vec<String>,
    pub failed: Vec<AttachmentError>,
}

/// Store write that a save was performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStep {
    /// `update_core_info`; nothing was written.
    CoreInfo,
    /// `update_extended_details`; core fields were already written.
    ExtendedDetails,
}

impl SaveStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoreInfo => "core_info",
            Self::ExtendedDetails => "extended_details",
        }
    }
}

/// Failed save, tagged with the write that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveError {
    pub step: SaveStep,
    pub source: PersistenceError,
}

impl SaveError {
    /// Core fields reached the store but the details block did not.
    pub fn is_partial(&self) -> bool {
        self.step == SaveStep::ExtendedDetails
    }
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "save failed at {}: {}", self.step.as_str(), self.source)
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Default)]
struct RequestSlot {
    pending: Option<RequestTicket>,
    error: Option<String>,
}

/// Working state of one open editor.
#[derive(Debug)]
pub struct EditorSession<G: IdGenerator> {
    epoch: u64,
    task_id: String,
    title: String,
    description: String,
    status: String,
    details: ExtendedDetails,
    service: BreakdownService,
    ids: G,
    next_sequence: u64,
    canvas: CanvasLayout,
    viewport: CanvasViewport,
    attachment_queue: AttachmentQueue,
    proposals: RequestSlot,
    report: RequestSlot,
    proposals_under_review: Option<ProposalBatch>,
    report_editor_open: bool,
}

impl<G: IdGenerator> EditorSession<G> {
    pub(crate) fn open(epoch: u64, task: &Task, service: BreakdownService, mut ids: G) -> Self {
        let details = match &task.extended_details {
            Some(details) => details.clone(),
            None => ExtendedDetails {
                sub_step_canvas_size: service.config().default_canvas_size,
                ..ExtendedDetails::default()
            },
        };
        ids.reserve_existing(&details);
        info!(
            "event=session_opened module=session status=ok epoch={} task_id={} substeps={}",
            epoch,
            task.id,
            details.sub_steps.len()
        );
        Self {
            epoch,
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.clone(),
            details,
            service,
            ids,
            next_sequence: 1,
            canvas: CanvasLayout::new(),
            viewport: CanvasViewport::default(),
            attachment_queue: AttachmentQueue::default(),
            proposals: RequestSlot::default(),
            report: RequestSlot::default(),
            proposals_under_review: None,
            report_editor_open: false,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn details(&self) -> &ExtendedDetails {
        &self.details
    }

    pub fn canvas(&self) -> &CanvasLayout {
        &self.canvas
    }

    pub fn viewport(&self) -> CanvasViewport {
        self.viewport
    }

    /// The Task as currently edited, including unsaved changes.
    pub fn task_snapshot(&self) -> Task {
        Task {
            id: self.task_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            extended_details: Some(self.details.clone()),
        }
    }

    pub fn core_update(&self) -> TaskCoreUpdate {
        TaskCoreUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn update_fields(&mut self, patch: &DetailsPatch) {
        self.details = self.service.update_fields(&self.details, patch);
    }

    pub fn add_sub_step(&mut self) -> String {
        let (next, id) = self.service.add_sub_step(&self.details, &mut self.ids);
        self.details = next;
        id
    }

    pub fn update_sub_step(&mut self, sub_step_id: &str, patch: &SubStepPatch) {
        self.details = self
            .service
            .update_sub_step(&self.details, sub_step_id, patch);
    }

    pub fn remove_sub_step(&mut self, sub_step_id: &str) {
        self.details = self.service.remove_sub_step(&self.details, sub_step_id);
    }

    pub fn add_action_item(&mut self, sub_step_id: &str) -> Option<String> {
        let (next, id) = self
            .service
            .add_action_item(&self.details, sub_step_id, &mut self.ids);
        self.details = next;
        id
    }

    pub fn update_action_item(
        &mut self,
        sub_step_id: &str,
        action_item_id: &str,
        patch: &ActionItemPatch,
    ) {
        self.details =
            self.service
                .update_action_item(&self.details, sub_step_id, action_item_id, patch);
    }

    pub fn remove_action_item(&mut self, sub_step_id: &str, action_item_id: &str) {
        self.details =
            self.service
                .remove_action_item(&self.details, sub_step_id, action_item_id);
    }

    /// Saves an item handed back by the report editor.
    pub fn save_action_item_report(&mut self, edited: &ActionItem) {
        self.details = self.service.update_action_item_report(&self.details, edited);
    }

    pub fn flatten_action_items(&self) -> FlattenedActionItems<'_> {
        flatten_action_items(&self.details, &self.title)
    }

    pub fn action_item_table(&self, scope: &TableScope) -> ActionItemTable<'_> {
        ActionItemTable::new(&self.details, &self.title, scope)
    }

    // Canvas

    pub fn press_card(&mut self, sub_step_id: &str, pointer: Position, canvas_origin: Position) -> bool {
        self.canvas
            .press(&self.details, sub_step_id, pointer, canvas_origin)
    }

    /// Moves the dragged card. Returns `false` when no drag is active.
    pub fn pointer_move(&mut self, pointer: Position, canvas_origin: Position) -> bool {
        match self
            .canvas
            .pointer_move(&self.service, &self.details, pointer, canvas_origin)
        {
            Some(next) => {
                self.details = next;
                true
            }
            None => false,
        }
    }

    pub fn release_pointer(&mut self) {
        self.canvas.release();
    }

    pub fn toggle_canvas_expanded(&mut self) -> bool {
        self.viewport.toggle_expanded()
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) -> Result<(), CanvasSizeError> {
        self.details = self.service.set_canvas_size(&self.details, width, height)?;
        Ok(())
    }

    // Attachments

    /// Queues a file read after the size check.
    pub fn queue_attachment(&mut self, blob: FileBlob) -> Result<(), AttachmentError> {
        let limit = self.service.config().max_attachment_bytes;
        self.attachment_queue.push(blob, limit)
    }

    pub fn pending_attachment_reads(&self) -> usize {
        self.attachment_queue.len()
    }

    /// Reads queued files in arrival order, appending each success.
    pub fn process_attachment_queue(&mut self, ingestor: &impl FileIngestor) -> AttachmentReadReport {
        let mut report = AttachmentReadReport::default();
        while let Some(blob) = self.attachment_queue.pop() {
            match self
                .service
                .add_attachment(&self.details, &blob, ingestor, &mut self.ids)
            {
                Ok((next, id)) => {
                    self.details = next;
                    report.added.push(id);
                }
                Err(err) => report.failed.push(err),
            }
        }
        report
    }

    pub fn remove_attachment(&mut self, attachment_id: &str) {
        self.details = self.service.remove_attachment(&self.details, attachment_id);
    }

    pub fn add_report_attachment(
        &mut self,
        action_item_id: &str,
        blob: &FileBlob,
        ingestor: &impl FileIngestor,
    ) -> Result<Option<String>, AttachmentError> {
        let (next, id) = self.service.add_report_attachment(
            &self.details,
            action_item_id,
            blob,
            ingestor,
            &mut self.ids,
        )?;
        self.details = next;
        Ok(id)
    }

    pub fn remove_report_attachment(&mut self, action_item_id: &str, attachment_id: &str) {
        self.details =
            self.service
                .remove_report_attachment(&self.details, action_item_id, attachment_id);
    }

    // Decisions and report deck

    pub fn set_decisions(&mut self, decisions: Vec<Value>) {
        self.details = self.service.set_decisions(&self.details, decisions);
    }

    /// Stores a deck saved from the report editor.
    pub fn save_report_deck(&mut self, deck: Value) {
        self.details = self.service.set_report_deck(&self.details, deck);
    }

    /// Stores a deck from the custom report flow and opens the editor.
    pub fn apply_custom_report(&mut self, deck: Value) {
        self.save_report_deck(deck);
        self.report_editor_open = true;
    }

    pub fn is_report_editor_open(&self) -> bool {
        self.report_editor_open
    }

    pub fn close_report_editor(&mut self) {
        self.report_editor_open = false;
    }

    /// Opens the existing deck, or starts a report request.
    pub fn open_report(&mut self) -> ReportRequest {
        if self.details.report_deck.is_some() {
            self.report_editor_open = true;
            return ReportRequest::Ready;
        }
        ReportRequest::Generate(self.begin_request(RequestKind::Report))
    }

    pub fn report_error(&self) -> Option<&str> {
        self.report.error.as_deref()
    }

    pub fn is_generating_report(&self) -> bool {
        self.report.pending.is_some()
    }

    pub(crate) fn finish_report_request(
        &mut self,
        ticket: RequestTicket,
        result: Result<Value, GenerationError>,
    ) -> DeliveryOutcome {
        if !self.take_pending(ticket) {
            return DeliveryOutcome::DroppedStale;
        }
        match result {
            Ok(deck) => {
                self.save_report_deck(deck);
                self.report_editor_open = true;
                info!(
                    "event=report_generated module=session status=ok epoch={}",
                    self.epoch
                );
                DeliveryOutcome::Applied
            }
            Err(err) => {
                self.hold_error(RequestKind::Report, &err);
                DeliveryOutcome::ErrorHeld
            }
        }
    }

    // Proposals

    /// Starts a proposal request and clears the held proposal error.
    pub fn begin_proposal_request(&mut self) -> RequestTicket {
        self.begin_request(RequestKind::Proposals)
    }

    pub fn proposal_error(&self) -> Option<&str> {
        self.proposals.error.as_deref()
    }

    pub fn is_generating_proposals(&self) -> bool {
        self.proposals.pending.is_some()
    }

    pub fn proposals_under_review(&self) -> Option<&ProposalBatch> {
        self.proposals_under_review.as_ref()
    }

    pub(crate) fn finish_proposal_request(
        &mut self,
        ticket: RequestTicket,
        result: Result<ProposalBatch, GenerationError>,
    ) -> DeliveryOutcome {
        if !self.take_pending(ticket) {
            return DeliveryOutcome::DroppedStale;
        }
        match result {
            Ok(batch) => {
                debug!(
                    "event=proposals_received module=session status=ok substeps={} action_items={}",
                    batch.sub_steps.len(),
                    batch.action_items.len()
                );
                self.proposals_under_review = Some(batch);
                DeliveryOutcome::Applied
            }
            Err(err) => {
                self.hold_error(RequestKind::Proposals, &err);
                DeliveryOutcome::ErrorHeld
            }
        }
    }

    /// Merges the reviewed batch and closes the review.
    pub fn confirm_proposals(&mut self, reviewed: &ProposalBatch) -> ReconcileOutcome {
        let outcome = reconcile(&self.details, reviewed, &mut self.ids, self.service.config());
        self.details = outcome.details.clone();
        self.proposals_under_review = None;
        outcome
    }

    pub fn dismiss_proposals(&mut self) {
        self.proposals_under_review = None;
    }

    pub fn dismiss_proposal_error(&mut self) {
        self.proposals.error = None;
    }

    pub fn dismiss_report_error(&mut self) {
        self.report.error = None;
    }

    /// Writes core fields, then the details block.
    ///
    /// A failure names the write that failed. When it is the details
    /// block, the store already holds the new core fields.
    pub fn save(&self, store: &mut impl TaskStore) -> Result<(), SaveError> {
        store
            .update_core_info(&self.task_id, &self.core_update())
            .map_err(|source| self.save_failed(SaveStep::CoreInfo, source))?;
        store
            .update_extended_details(&self.task_id, &self.details)
            .map_err(|source| self.save_failed(SaveStep::ExtendedDetails, source))
    }

    fn save_failed(&self, step: SaveStep, source: PersistenceError) -> SaveError {
        warn!(
            "event=save_failed module=session status=error epoch={} task_id={} step={}",
            self.epoch,
            self.task_id,
            step.as_str()
        );
        SaveError { step, source }
    }

    fn slot_mut(&mut self, kind: RequestKind) -> &mut RequestSlot {
        match kind {
            RequestKind::Proposals => &mut self.proposals,
            RequestKind::Report => &mut self.report,
        }
    }

    fn begin_request(&mut self, kind: RequestKind) -> RequestTicket {
        let ticket = RequestTicket {
            session_epoch: self.epoch,
            sequence: self.next_sequence,
            kind,
        };
        self.next_sequence += 1;
        let slot = self.slot_mut(kind);
        if let Some(previous) = slot.pending.replace(ticket) {
            debug!(
                "event=request_superseded module=session status=noop kind={} sequence={}",
                kind.as_str(),
                previous.sequence
            );
        }
        slot.error = None;
        ticket
    }

    fn take_pending(&mut self, ticket: RequestTicket) -> bool {
        let epoch = self.epoch;
        let slot = self.slot_mut(ticket.kind);
        if ticket.session_epoch != epoch || slot.pending != Some(ticket) {
            warn!(
                "event=result_dropped module=session status=stale kind={} sequence={}",
                ticket.kind.as_str(),
                ticket.sequence
            );
            return false;
        }
        slot.pending = None;
        true
    }

    fn hold_error(&mut self, kind: RequestKind, err: &GenerationError) {
        warn!(
            "event=generation_failed module=session status=error kind={}",
            kind.as_str()
        );
        self.slot_mut(kind).error = Some(err.banner_message(kind));
    }
}
