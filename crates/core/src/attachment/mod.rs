//! Attachment orchestration for chat messages and knowledge items.
//!
//! This module mediates between raw attachment payloads and durable storage:
//! - Size policy enforcement (aggregate cap per message batch, per-item cap
//!   for knowledge items)
//! - Metadata derivation (sanitized file name, byte length, extension)
//! - Buffer/stream retrieval and `data:` URI rendering
//! - Batched deletion and best-effort cleanup after partial failure

mod error;
mod object;
mod service;
mod types;

pub use error::AttachmentError;
pub use service::{AttachmentIndex, AttachmentService, BinaryStore};
pub use types::{
    AttachmentLimits, AttachmentMetadata, AttachmentPayload, AttachmentRecord, OwnerScope,
    RawAttachment, RetrievedAttachment, ScopeQuery, file_extension_of, sanitize_file_name,
};
