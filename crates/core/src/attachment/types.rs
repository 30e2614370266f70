//! Attachment types and data structures.

use bytes::Bytes;
use chathub_shared::config::AttachmentSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AttachmentError;
use crate::store::ByteStream;

/// Raw attachment payload as submitted by a caller, pre-storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttachment {
    /// Base64-encoded file contents.
    pub data: String,
    /// Declared MIME type, free-form.
    pub mime_type: String,
    /// Declared file name, unsanitized.
    pub file_name: String,
}

/// Where an attachment's bytes live.
///
/// Exactly one representation applies to any stored attachment; the enum makes
/// the "id and inline data both missing" state unrepresentable. Wire records
/// that carry neither are rejected at conversion (see
/// [`AttachmentRecord::from_parts`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPayload {
    /// Payload carried in the record itself: base64 data or a full `data:` URI.
    Inline {
        /// Base64-encoded payload or `data:` URI.
        data: String,
    },
    /// Payload held by the external binary store.
    External {
        /// Opaque identifier issued by the store.
        id: String,
        /// Storage-mode sentinel occupying the wire-level `data` field.
        mode: String,
    },
}

/// Descriptor metadata derived from a raw attachment before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMetadata {
    /// Sanitized display name.
    pub file_name: String,
    /// Declared MIME type, free-form; empty means unknown.
    pub mime_type: String,
    /// Decimal string of the payload byte length.
    pub file_size: String,
    /// Final dot-segment of the sanitized name, lowercased.
    pub file_extension: Option<String>,
}

impl AttachmentMetadata {
    /// Build metadata for a decoded payload: sanitize the file name, record the
    /// byte length as a decimal string, and derive the extension.
    #[must_use]
    pub fn for_payload(file_name: &str, mime_type: &str, byte_len: usize) -> Self {
        let file_name = sanitize_file_name(file_name);
        let file_extension = file_extension_of(&file_name);
        Self {
            file_name,
            mime_type: mime_type.to_string(),
            file_size: byte_len.to_string(),
            file_extension,
        }
    }
}

/// Durable, storage-backend-agnostic descriptor of a stored attachment.
///
/// Created once per stored attachment and immutable thereafter. Serializes
/// to/from the host platform's JSON shape (`id?`, `data`, `mimeType`,
/// `fileName`, `fileSize`, `fileExtension?`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord", into = "WireRecord")]
pub struct AttachmentRecord {
    /// Inline payload or external store reference.
    pub payload: AttachmentPayload,
    /// MIME type, free-form; empty means unknown.
    pub mime_type: String,
    /// Sanitized display name.
    pub file_name: String,
    /// Decimal string of the payload byte length.
    pub file_size: String,
    /// Final dot-segment of the file name, if any.
    pub file_extension: Option<String>,
}

impl AttachmentRecord {
    /// Create a record referencing an externally stored payload.
    #[must_use]
    pub fn external(
        id: impl Into<String>,
        mode: impl Into<String>,
        metadata: AttachmentMetadata,
    ) -> Self {
        Self {
            payload: AttachmentPayload::External {
                id: id.into(),
                mode: mode.into(),
            },
            mime_type: metadata.mime_type,
            file_name: metadata.file_name,
            file_size: metadata.file_size,
            file_extension: metadata.file_extension,
        }
    }

    /// Create a record carrying its payload inline.
    #[must_use]
    pub fn inline(data: impl Into<String>, metadata: AttachmentMetadata) -> Self {
        Self {
            payload: AttachmentPayload::Inline { data: data.into() },
            mime_type: metadata.mime_type,
            file_name: metadata.file_name,
            file_size: metadata.file_size,
            file_extension: metadata.file_extension,
        }
    }

    /// Reassemble a record from its wire-level parts.
    ///
    /// A present `id` wins: the `data` field is then the storage-mode sentinel.
    /// Without an `id`, non-empty `data` is the inline payload.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::NoPayload`] when neither an `id` nor inline
    /// data is present; such a record has nothing to retrieve.
    pub fn from_parts(
        id: Option<String>,
        data: String,
        mime_type: String,
        file_name: String,
        file_size: String,
        file_extension: Option<String>,
    ) -> Result<Self, AttachmentError> {
        let payload = match id {
            Some(id) => AttachmentPayload::External { id, mode: data },
            None if !data.is_empty() => AttachmentPayload::Inline { data },
            None => return Err(AttachmentError::NoPayload),
        };

        Ok(Self {
            payload,
            mime_type,
            file_name,
            file_size,
            file_extension,
        })
    }

    /// The MIME type to present to clients, defaulting to
    /// `application/octet-stream` when the record carries none.
    #[must_use]
    pub fn mime_type_or_default(&self) -> &str {
        if self.mime_type.is_empty() {
            "application/octet-stream"
        } else {
            &self.mime_type
        }
    }
}

/// Wire-compatible JSON shape of an attachment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    data: String,
    mime_type: String,
    file_name: String,
    file_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_extension: Option<String>,
}

impl TryFrom<WireRecord> for AttachmentRecord {
    type Error = AttachmentError;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        Self::from_parts(
            wire.id,
            wire.data,
            wire.mime_type,
            wire.file_name,
            wire.file_size,
            wire.file_extension,
        )
    }
}

impl From<AttachmentRecord> for WireRecord {
    fn from(record: AttachmentRecord) -> Self {
        let (id, data) = match record.payload {
            AttachmentPayload::Inline { data } => (None, data),
            AttachmentPayload::External { id, mode } => (Some(id), mode),
        };

        Self {
            id,
            data,
            mime_type: record.mime_type,
            file_name: record.file_name,
            file_size: record.file_size,
            file_extension: record.file_extension,
        }
    }
}

/// Storage location of an attachment's owning entity.
///
/// Keys follow the platform's hierarchical scheme:
/// domain area / container id / sub-container id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// A chat message inside a session.
    Message {
        /// Owning chat session.
        session_id: Uuid,
        /// Owning message.
        message_id: Uuid,
    },
    /// A user-owned knowledge item, decoupled from any single message.
    KnowledgeItem {
        /// Owning user.
        user_id: Uuid,
        /// Knowledge item.
        item_id: Uuid,
    },
}

impl OwnerScope {
    /// Key prefix for all attachments under this owner.
    #[must_use]
    pub fn storage_prefix(&self) -> String {
        match self {
            Self::Message {
                session_id,
                message_id,
            } => format!("chat/{session_id}/{message_id}"),
            Self::KnowledgeItem { user_id, item_id } => format!("knowledge/{user_id}/{item_id}"),
        }
    }

    /// Full object key for one attachment under this owner.
    ///
    /// Format: `{prefix}/{attachment_id}/{sanitized_filename}`
    #[must_use]
    pub fn object_key(&self, attachment_id: Uuid, file_name: &str) -> String {
        format!("{}/{}/{}", self.storage_prefix(), attachment_id, file_name)
    }
}

/// Filter for administrative attachment sweeps.
///
/// An empty query matches nothing on its own; sweeping everything goes through
/// the dedicated unscoped operation.
#[derive(Debug, Clone, Default)]
pub struct ScopeQuery {
    /// Restrict to owners belonging to this user.
    pub user_id: Option<Uuid>,
    /// Restrict to these chat sessions.
    pub session_ids: Option<Vec<Uuid>>,
}

impl std::fmt::Debug for RetrievedAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream { file_size, .. } => f
                .debug_struct("Stream")
                .field("file_size", file_size)
                .finish_non_exhaustive(),
            Self::Buffer { buffer, file_size } => f
                .debug_struct("Buffer")
                .field("buffer", buffer)
                .field("file_size", file_size)
                .finish(),
        }
    }
}

/// Result of retrieving an attachment's bytes.
///
/// Callers must branch on the variant: externally stored payloads are
/// streamed to avoid buffering large files in memory, inline payloads are
/// decoded into a buffer.
pub enum RetrievedAttachment {
    /// Streaming read from the external store.
    Stream {
        /// Byte stream over the stored object.
        stream: ByteStream,
        /// Object size in bytes, from store metadata.
        file_size: u64,
    },
    /// Decoded in-memory payload.
    Buffer {
        /// Decoded bytes.
        buffer: Bytes,
        /// Decoded length in bytes.
        file_size: u64,
    },
}

impl RetrievedAttachment {
    /// Byte length of the retrieved payload.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        match self {
            Self::Stream { file_size, .. } | Self::Buffer { file_size, .. } => *file_size,
        }
    }
}

/// Size policy for attachment storage, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    /// Aggregate cap across all attachments in one batch store call.
    pub max_batch_total_bytes: u64,
    /// Per-item cap for knowledge-item attachments.
    pub max_item_bytes: u64,
}

impl AttachmentLimits {
    /// Default aggregate cap per message batch: 200 MiB.
    pub const DEFAULT_MAX_BATCH_TOTAL_BYTES: u64 = 200 * 1024 * 1024;
    /// Default per-item cap for knowledge items: 50 MiB.
    pub const DEFAULT_MAX_ITEM_BYTES: u64 = 50 * 1024 * 1024;

    /// Build limits from loaded configuration.
    #[must_use]
    pub fn from_settings(settings: &AttachmentSettings) -> Self {
        Self {
            max_batch_total_bytes: settings.max_batch_total_bytes,
            max_item_bytes: settings.max_item_bytes,
        }
    }

    /// Override the aggregate batch cap.
    #[must_use]
    pub fn with_max_batch_total_bytes(mut self, bytes: u64) -> Self {
        self.max_batch_total_bytes = bytes;
        self
    }

    /// Override the per-item cap.
    #[must_use]
    pub fn with_max_item_bytes(mut self, bytes: u64) -> Self {
        self.max_item_bytes = bytes;
        self
    }
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_batch_total_bytes: Self::DEFAULT_MAX_BATCH_TOTAL_BYTES,
            max_item_bytes: Self::DEFAULT_MAX_ITEM_BYTES,
        }
    }
}

/// Sanitize a declared file name for storage and display.
///
/// Drops any path components, then replaces characters outside ASCII
/// alphanumerics, dots, hyphens, and underscores.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the file extension from a file name's final dot-segment.
#[must_use]
pub fn file_extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("notes.txt"), "notes.txt");
        assert_eq!(sanitize_file_name("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\report.docx"), "report.docx");
        assert_eq!(sanitize_file_name("日本語.pdf"), "___.pdf");
    }

    #[rstest]
    #[case("report.pdf", Some("pdf"))]
    #[case("archive.tar.gz", Some("gz"))]
    #[case("UPPER.PNG", Some("png"))]
    #[case("noext", None)]
    #[case("trailing.", None)]
    fn test_file_extension_of(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(file_extension_of(name).as_deref(), expected);
    }

    #[test]
    fn test_metadata_for_payload() {
        let meta = AttachmentMetadata::for_payload("meeting notes.txt", "text/plain", 10);
        assert_eq!(meta.file_name, "meeting_notes.txt");
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.file_size, "10");
        assert_eq!(meta.file_extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_from_parts_external() {
        let record = AttachmentRecord::from_parts(
            Some("chat/abc/def/file.png".to_string()),
            "s3".to_string(),
            "image/png".to_string(),
            "file.png".to_string(),
            "2048".to_string(),
            Some("png".to_string()),
        )
        .expect("valid record");

        assert_eq!(
            record.payload,
            AttachmentPayload::External {
                id: "chat/abc/def/file.png".to_string(),
                mode: "s3".to_string(),
            }
        );
    }

    #[test]
    fn test_from_parts_inline() {
        let record = AttachmentRecord::from_parts(
            None,
            "aGVsbG8=".to_string(),
            "text/plain".to_string(),
            "hello.txt".to_string(),
            "5".to_string(),
            Some("txt".to_string()),
        )
        .expect("valid record");

        assert!(matches!(
            record.payload,
            AttachmentPayload::Inline { ref data } if data == "aGVsbG8="
        ));
    }

    #[test]
    fn test_from_parts_no_payload() {
        let result = AttachmentRecord::from_parts(
            None,
            String::new(),
            "text/plain".to_string(),
            "hello.txt".to_string(),
            "0".to_string(),
            None,
        );
        assert!(matches!(result, Err(AttachmentError::NoPayload)));
    }

    #[test]
    fn test_wire_roundtrip_external() {
        let meta = AttachmentMetadata::for_payload("file.png", "image/png", 2048);
        let record = AttachmentRecord::external("chat/a/b/file.png", "s3", meta);

        let json = serde_json::to_value(&record).expect("serializes");
        assert_eq!(json["id"], "chat/a/b/file.png");
        assert_eq!(json["data"], "s3");
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["fileSize"], "2048");

        let back: AttachmentRecord = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, record);
    }

    #[test]
    fn test_wire_roundtrip_inline() {
        let meta = AttachmentMetadata::for_payload("hello.txt", "text/plain", 5);
        let record = AttachmentRecord::inline("aGVsbG8=", meta);

        let json = serde_json::to_value(&record).expect("serializes");
        assert!(json.get("id").is_none());
        assert_eq!(json["data"], "aGVsbG8=");

        let back: AttachmentRecord = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, record);
    }

    #[test]
    fn test_wire_rejects_empty_record() {
        let json = serde_json::json!({
            "data": "",
            "mimeType": "text/plain",
            "fileName": "hello.txt",
            "fileSize": "0",
        });
        let result: Result<AttachmentRecord, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_mime_type_default() {
        let meta = AttachmentMetadata::for_payload("blob", "", 1);
        let record = AttachmentRecord::inline("AA==", meta);
        assert_eq!(record.mime_type_or_default(), "application/octet-stream");
    }

    #[test]
    fn test_owner_scope_keys() {
        let session_id =
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").expect("valid uuid");
        let message_id =
            Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid");
        let attachment_id =
            Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid");

        let scope = OwnerScope::Message {
            session_id,
            message_id,
        };
        let key = scope.object_key(attachment_id, "notes.txt");

        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "chat");
        assert_eq!(parts[1], session_id.to_string());
        assert_eq!(parts[2], message_id.to_string());
        assert_eq!(parts[3], attachment_id.to_string());
        assert_eq!(parts[4], "notes.txt");
    }

    #[test]
    fn test_knowledge_scope_prefix() {
        let user_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let scope = OwnerScope::KnowledgeItem { user_id, item_id };
        assert_eq!(
            scope.storage_prefix(),
            format!("knowledge/{user_id}/{item_id}")
        );
    }

    #[test]
    fn test_limits_defaults_and_overrides() {
        let limits = AttachmentLimits::default();
        assert_eq!(limits.max_batch_total_bytes, 200 * 1024 * 1024);
        assert_eq!(limits.max_item_bytes, 50 * 1024 * 1024);

        let limits = limits
            .with_max_batch_total_bytes(1024)
            .with_max_item_bytes(512);
        assert_eq!(limits.max_batch_total_bytes, 1024);
        assert_eq!(limits.max_item_bytes, 512);
    }
}
