//! External content generators.
//!
//! Only the input/output contract lives here; generation itself is
//! provided by the shell.

use crate::model::task::Task;
use crate::service::reconciler::ProposalBatch;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of async collaborator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Proposals,
    Report,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proposals => "proposals",
            Self::Report => "report",
        }
    }

    /// Banner text used when the collaborator gave no message.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Proposals => "Failed to generate step proposals.",
            Self::Report => "Failed to generate the report.",
        }
    }
}

/// Failure of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationError {
    message: Option<String>,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    /// Failure without a usable message.
    pub fn unspecified() -> Self {
        Self { message: None }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Message for the dismissible banner.
    pub fn banner_message(&self, kind: RequestKind) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| kind.fallback_message().to_string())
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "generation failed: {message}"),
            None => write!(f, "generation failed"),
        }
    }
}

impl Error for GenerationError {}

/// Produces SubStep/ActionItem proposals for a Task.
pub trait ProposalGenerator {
    fn generate(&self, task: &Task) -> Result<ProposalBatch, GenerationError>;
}

/// Produces an opaque slide deck for a Task.
pub trait ReportGenerator {
    fn generate(&self, task: &Task, project_goal: &str) -> Result<Value, GenerationError>;
}
