//! Core engine for the work-breakdown editor.
//! This crate is the single source of truth for breakdown invariants:
//! identity-preserving proposal merges, canvas drag math and stable
//! table ordering.

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, EditorConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::identity::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use model::task::{
    ActionItem, ActionItemReport, Attachment, CanvasSize, ExtendedDetails, Position, SubStep,
    SubStepStatus, Task,
};
pub use repo::task_store::{InMemoryTaskStore, PersistenceError, TaskCoreUpdate, TaskStore};
pub use service::attachment::{
    AttachmentError, DataUrlIngestor, FileBlob, FileIngestor, IngestError, IngestedFile,
};
pub use service::breakdown::{
    flatten_action_items, ActionItemPatch, BreakdownService, CanvasSizeError, DetailsPatch,
    FlattenedActionItem, SubStepPatch,
};
pub use service::canvas::{CanvasLayout, CanvasViewport, DragState};
pub use service::reconciler::{
    reconcile, ProposalBatch, ProposedActionItem, ProposedSubStep, ReconcileOutcome,
};
pub use service::sort::{
    sorted_rows, ActionItemTable, SortConfig, SortDirection, SortKey, SortState, TableScope,
};
pub use session::collaborators::{GenerationError, ProposalGenerator, ReportGenerator, RequestKind};
pub use session::editor::{
    AttachmentReadReport, DeliveryOutcome, EditorSession, ReportRequest, RequestTicket, SaveError,
    SaveStep,
};
pub use session::host::{EditorHost, SessionError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
