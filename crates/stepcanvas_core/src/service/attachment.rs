//! Attachment ingestion and bookkeeping.
//!
//! # Responsibility
//! - Enforce the size ceiling before any ingestion call.
//! - Validate ingestion results and turn them into immutable attachments.
//! - Serialize file reads through a FIFO queue.
//!
//! # Invariants
//! - A rejected file never reaches the ingestor and never changes state.
//! - Attachments are only appended or removed, never edited.

use crate::model::identity::{IdGenerator, ATTACHMENT_ID_PREFIX};
use crate::model::task::{ActionItemReport, Attachment, ExtendedDetails};
use crate::service::breakdown::{ActionItemPatch, BreakdownService};
use base64::Engine;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

static DATA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:[A-Za-z0-9!#$&^_.+-]*(/[A-Za-z0-9!#$&^_.+-]+)?(;[^,;]+)*,")
        .expect("valid data url regex")
});

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Raw file handed over by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of a successful file read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub name: String,
    pub mime_type: String,
    pub data_url: String,
}

/// Failure reported by a `FileIngestor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestError {
    pub message: String,
}

impl IngestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "file read failed: {}", self.message)
    }
}

impl Error for IngestError {}

/// External file reader producing a self-contained data URL.
pub trait FileIngestor {
    fn ingest(&self, blob: &FileBlob) -> Result<IngestedFile, IngestError>;
}

/// In-process ingestor that base64-encodes the blob bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlIngestor;

impl FileIngestor for DataUrlIngestor {
    fn ingest(&self, blob: &FileBlob) -> Result<IngestedFile, IngestError> {
        let mime_type = if blob.mime_type.trim().is_empty() {
            FALLBACK_MIME_TYPE
        } else {
            blob.mime_type.trim()
        };
        let payload = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
        Ok(IngestedFile {
            name: blob.name.clone(),
            mime_type: mime_type.to_string(),
            data_url: format!("data:{mime_type};base64,{payload}"),
        })
    }
}

/// User-facing attachment failures. None of them changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// File exceeds the configured ceiling; the ingestor was not called.
    TooLarge { name: String, size: u64, limit: u64 },
    /// Ingestor returned something that is not a data URL.
    MalformedDataUrl { name: String },
    /// Ingestor failed.
    Ingestion(IngestError),
}

impl Display for AttachmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge { name, size, limit } => write!(
                f,
                "file `{name}` is too large ({size} bytes); choose a file under {}",
                human_limit(*limit)
            ),
            Self::MalformedDataUrl { name } => write!(f, "failed to read file `{name}`"),
            Self::Ingestion(err) => write!(f, "{err}"),
        }
    }
}

/// Whole MiB render as `N MB`; anything else stays in bytes.
fn human_limit(limit: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if limit >= MIB && limit % MIB == 0 {
        format!("{} MB", limit / MIB)
    } else {
        format!("{limit} bytes")
    }
}

impl Error for AttachmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ingestion(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IngestError> for AttachmentError {
    fn from(value: IngestError) -> Self {
        Self::Ingestion(value)
    }
}

/// Rejects files larger than `limit` bytes.
pub fn ensure_within_limit(blob: &FileBlob, limit: u64) -> Result<(), AttachmentError> {
    if blob.size() > limit {
        warn!(
            "event=attachment_rejected module=attachment status=error reason=too_large size={} limit={}",
            blob.size(),
            limit
        );
        return Err(AttachmentError::TooLarge {
            name: blob.name.clone(),
            size: blob.size(),
            limit,
        });
    }
    Ok(())
}

/// Checks the ceiling, calls the ingestor and builds the attachment.
pub fn ingest_attachment(
    blob: &FileBlob,
    ingestor: &impl FileIngestor,
    ids: &mut impl IdGenerator,
    limit: u64,
) -> Result<Attachment, AttachmentError> {
    ensure_within_limit(blob, limit)?;
    let file = ingestor.ingest(blob)?;
    if !DATA_URL_RE.is_match(&file.data_url) {
        warn!("event=attachment_rejected module=attachment status=error reason=malformed_data_url");
        return Err(AttachmentError::MalformedDataUrl { name: file.name });
    }
    Ok(Attachment {
        id: ids.generate(ATTACHMENT_ID_PREFIX),
        name: file.name,
        mime_type: file.mime_type,
        data_url: Arc::from(file.data_url),
    })
}

impl BreakdownService {
    /// Ingests one file and appends it to the Task attachments.
    pub fn add_attachment(
        &self,
        details: &ExtendedDetails,
        blob: &FileBlob,
        ingestor: &impl FileIngestor,
        ids: &mut impl IdGenerator,
    ) -> Result<(ExtendedDetails, String), AttachmentError> {
        let attachment =
            ingest_attachment(blob, ingestor, ids, self.config().max_attachment_bytes)?;
        let id = attachment.id.clone();
        let mut next = details.clone();
        next.attachments.push(attachment);
        debug!(
            "event=attachment_added module=attachment status=ok attachment_id={} count={}",
            id,
            next.attachments.len()
        );
        Ok((next, id))
    }

    /// Drops one Task attachment; unknown ids are a no-op.
    pub fn remove_attachment(&self, details: &ExtendedDetails, attachment_id: &str) -> ExtendedDetails {
        let mut next = details.clone();
        next.attachments
            .retain(|attachment| attachment.id != attachment_id);
        next
    }

    /// Ingests one file into the report of the ActionItem `action_item_id`.
    ///
    /// The item is located Task-wide. An unknown item leaves the details
    /// unchanged and returns `None` for the id, after the size check.
    pub fn add_report_attachment(
        &self,
        details: &ExtendedDetails,
        action_item_id: &str,
        blob: &FileBlob,
        ingestor: &impl FileIngestor,
        ids: &mut impl IdGenerator,
    ) -> Result<(ExtendedDetails, Option<String>), AttachmentError> {
        ensure_within_limit(blob, self.config().max_attachment_bytes)?;
        let Some((owner, item)) = details.find_action_item(action_item_id) else {
            debug!(
                "event=lookup_miss module=attachment status=noop operation=add_report_attachment id={}",
                action_item_id
            );
            return Ok((details.clone(), None));
        };
        let attachment =
            ingest_attachment(blob, ingestor, ids, self.config().max_attachment_bytes)?;
        let id = attachment.id.clone();

        let mut report = item.report.clone().unwrap_or_default();
        report.attachments.push(attachment);
        let patch = ActionItemPatch {
            report: Some(Some(report)),
            ..ActionItemPatch::default()
        };
        let next = self.update_action_item(details, &owner.id, action_item_id, &patch);
        Ok((next, Some(id)))
    }

    /// Drops one attachment from an ActionItem report.
    pub fn remove_report_attachment(
        &self,
        details: &ExtendedDetails,
        action_item_id: &str,
        attachment_id: &str,
    ) -> ExtendedDetails {
        let Some((owner, item)) = details.find_action_item(action_item_id) else {
            return details.clone();
        };
        let Some(report) = item.report.as_ref() else {
            return details.clone();
        };
        let report = ActionItemReport {
            notes: report.notes.clone(),
            attachments: report
                .attachments
                .iter()
                .filter(|attachment| attachment.id != attachment_id)
                .cloned()
                .collect(),
        };
        let patch = ActionItemPatch {
            report: Some(Some(report)),
            ..ActionItemPatch::default()
        };
        self.update_action_item(details, &owner.id, action_item_id, &patch)
    }
}

/// FIFO of validated files waiting to be read, one at a time.
#[derive(Debug, Default)]
pub struct AttachmentQueue {
    pending: VecDeque<FileBlob>,
}

impl AttachmentQueue {
    /// Enqueues a file after the size check. Oversized files are rejected
    /// without being queued.
    pub fn push(&mut self, blob: FileBlob, limit: u64) -> Result<(), AttachmentError> {
        ensure_within_limit(&blob, limit)?;
        self.pending.push_back(blob);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<FileBlob> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ingest_attachment, AttachmentError, AttachmentQueue, DataUrlIngestor, FileBlob,
        FileIngestor, IngestError, IngestedFile,
    };
    use crate::model::identity::SequentialIdGenerator;

    struct RawTextIngestor;

    impl FileIngestor for RawTextIngestor {
        fn ingest(&self, blob: &FileBlob) -> Result<IngestedFile, IngestError> {
            Ok(IngestedFile {
                name: blob.name.clone(),
                mime_type: blob.mime_type.clone(),
                data_url: "not a data url".to_string(),
            })
        }
    }

    #[test]
    fn data_url_ingestor_encodes_base64() {
        let blob = FileBlob::new("hi.txt", "text/plain", b"hi".to_vec());
        let file = DataUrlIngestor.ingest(&blob).unwrap();
        assert_eq!(file.data_url, "data:text/plain;base64,aGk=");
    }

    #[test]
    fn data_url_ingestor_falls_back_for_missing_mime() {
        let blob = FileBlob::new("blob.bin", "", vec![0]);
        let file = DataUrlIngestor.ingest(&blob).unwrap();
        assert!(file.data_url.starts_with("data:application/octet-stream;base64,"));
        assert_eq!(file.mime_type, "application/octet-stream");
    }

    #[test]
    fn data_url_ingestor_reports_the_type_it_encoded() {
        let blob = FileBlob::new("notes.md", "  text/markdown ", b"#".to_vec());
        let file = DataUrlIngestor.ingest(&blob).unwrap();
        assert_eq!(file.mime_type, "text/markdown");
        assert!(file.data_url.starts_with("data:text/markdown;base64,"));
    }

    #[test]
    fn too_large_message_names_limits_below_one_mib() {
        let err = AttachmentError::TooLarge {
            name: "scan.png".to_string(),
            size: 600 * 1024,
            limit: 512 * 1024,
        };
        assert!(err.to_string().ends_with("choose a file under 524288 bytes"));

        let err = AttachmentError::TooLarge {
            name: "scan.png".to_string(),
            size: 6 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        };
        assert!(err.to_string().ends_with("choose a file under 5 MB"));
    }

    #[test]
    fn malformed_ingestion_result_is_rejected() {
        let blob = FileBlob::new("a.txt", "text/plain", b"a".to_vec());
        let mut ids = SequentialIdGenerator::new();
        let err = ingest_attachment(&blob, &RawTextIngestor, &mut ids, 1024).unwrap_err();
        assert_eq!(
            err,
            AttachmentError::MalformedDataUrl {
                name: "a.txt".to_string()
            }
        );
    }

    #[test]
    fn queue_rejects_oversized_without_enqueuing() {
        let mut queue = AttachmentQueue::default();
        let err = queue
            .push(FileBlob::new("big", "text/plain", vec![0; 11]), 10)
            .unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { size: 11, limit: 10, .. }));
        assert!(queue.is_empty());

        queue
            .push(FileBlob::new("first", "text/plain", vec![0; 10]), 10)
            .unwrap();
        queue
            .push(FileBlob::new("second", "text/plain", vec![0; 1]), 10)
            .unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().name, "first");
    }
}
