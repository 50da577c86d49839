//! Session host.
//!
//! # Responsibility
//! - Open and close the single editing session.
//! - Deliver async collaborator results with a stale-result guard.
//! - Drive the persistence boundary on save.

use crate::config::EditorConfig;
use crate::model::identity::IdGenerator;
use crate::model::task::Task;
use crate::repo::task_store::TaskStore;
use crate::service::breakdown::BreakdownService;
use crate::service::reconciler::ProposalBatch;
use crate::session::collaborators::{GenerationError, ProposalGenerator, ReportGenerator};
use crate::session::editor::{
    DeliveryOutcome, EditorSession, ReportRequest, RequestTicket, SaveError,
};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from host-level session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No editor is open.
    NoOpenSession,
    /// Saving failed; the session stays open.
    Persistence(SaveError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOpenSession => write!(f, "no editor session is open"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::NoOpenSession => None,
        }
    }
}

impl From<SaveError> for SessionError {
    fn from(value: SaveError) -> Self {
        Self::Persistence(value)
    }
}

/// Owner of the single open editor session.
#[derive(Debug)]
pub struct EditorHost<G: IdGenerator> {
    service: BreakdownService,
    next_epoch: u64,
    session: Option<EditorSession<G>>,
}

impl<G: IdGenerator> EditorHost<G> {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            service: BreakdownService::new(config),
            next_epoch: 1,
            session: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        self.service.config()
    }

    /// Opens an editor on `task`, closing any session still open.
    ///
    /// `ids` reserves every identifier already in the task's details, so
    /// new nodes never reuse a stored id.
    pub fn open(&mut self, task: &Task, ids: G) -> &mut EditorSession<G> {
        if self.close() {
            warn!("event=session_replaced module=host status=ok");
        }
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.session
            .insert(EditorSession::open(epoch, task, self.service.clone(), ids))
    }

    /// Tears down the open session without saving.
    ///
    /// Returns whether a session was open.
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                info!(
                    "event=session_closed module=host status=ok epoch={}",
                    session.epoch()
                );
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&EditorSession<G>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession<G>> {
        self.session.as_mut()
    }

    /// Delivers a proposal result. Dropped when the session it was
    /// requested from is gone or the request was superseded.
    pub fn complete_proposals(
        &mut self,
        ticket: RequestTicket,
        result: Result<ProposalBatch, GenerationError>,
    ) -> DeliveryOutcome {
        match self.session_for(ticket) {
            Some(session) => session.finish_proposal_request(ticket, result),
            None => DeliveryOutcome::DroppedStale,
        }
    }

    /// Delivers a report result under the same guard as proposals.
    pub fn complete_report(
        &mut self,
        ticket: RequestTicket,
        result: Result<Value, GenerationError>,
    ) -> DeliveryOutcome {
        match self.session_for(ticket) {
            Some(session) => session.finish_report_request(ticket, result),
            None => DeliveryOutcome::DroppedStale,
        }
    }

    /// Runs proposal generation inline and delivers the result.
    pub fn generate_proposals(
        &mut self,
        generator: &impl ProposalGenerator,
    ) -> Result<DeliveryOutcome, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoOpenSession)?;
        let ticket = session.begin_proposal_request();
        let result = generator.generate(&session.task_snapshot());
        Ok(self.complete_proposals(ticket, result))
    }

    /// Opens the existing deck or generates one inline.
    pub fn open_report(
        &mut self,
        generator: &impl ReportGenerator,
        project_goal: &str,
    ) -> Result<DeliveryOutcome, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoOpenSession)?;
        match session.open_report() {
            ReportRequest::Ready => Ok(DeliveryOutcome::Applied),
            ReportRequest::Generate(ticket) => {
                let result = generator.generate(&session.task_snapshot(), project_goal);
                Ok(self.complete_report(ticket, result))
            }
        }
    }

    /// Saves core fields and details, then closes the session.
    ///
    /// On failure the session stays open so the user can retry.
    pub fn save(&mut self, store: &mut impl TaskStore) -> Result<(), SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NoOpenSession)?;
        session.save(store)?;
        self.close();
        Ok(())
    }

    /// Closes without saving.
    pub fn cancel(&mut self) -> bool {
        self.close()
    }

    fn session_for(&mut self, ticket: RequestTicket) -> Option<&mut EditorSession<G>> {
        let session = self
            .session
            .as_mut()
            .filter(|session| session.epoch() == ticket.session_epoch);
        if session.is_none() {
            warn!(
                "event=result_dropped module=host status=stale kind={} epoch={}",
                ticket.kind.as_str(),
                ticket.session_epoch
            );
        }
        session
    }
}
