//! Attachment error types.

use chathub_shared::AppError;
use thiserror::Error;

use crate::store::StoreError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Aggregate batch size cap exceeded.
    #[error(
        "Attachments exceed the maximum total size of {} MB per message",
        .max_bytes / BYTES_PER_MB
    )]
    BatchTooLarge {
        /// Configured aggregate cap in bytes.
        max_bytes: u64,
    },

    /// Per-item size cap exceeded.
    #[error("Attachment exceeds the maximum size of {} MB", .max_bytes / BYTES_PER_MB)]
    ItemTooLarge {
        /// Configured per-item cap in bytes.
        max_bytes: u64,
    },

    /// Record carries neither a storage id nor inline data.
    #[error("Attachment record has neither a storage id nor inline data")]
    NoPayload,

    /// Payload is not decodable base64.
    #[error("Attachment payload is not valid base64: {0}")]
    InvalidPayload(String),

    /// Binary store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AttachmentError {
    /// Create an aggregate size-limit error.
    #[must_use]
    pub fn batch_too_large(max_bytes: u64) -> Self {
        Self::BatchTooLarge { max_bytes }
    }

    /// Create a per-item size-limit error.
    #[must_use]
    pub fn item_too_large(max_bytes: u64) -> Self {
        Self::ItemTooLarge { max_bytes }
    }

    /// Create an invalid payload error.
    #[must_use]
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match &err {
            AttachmentError::BatchTooLarge { .. }
            | AttachmentError::ItemTooLarge { .. }
            | AttachmentError::InvalidPayload(_) => Self::Validation(err.to_string()),
            AttachmentError::NoPayload | AttachmentError::Store(StoreError::NotFound { .. }) => {
                Self::NotFound(err.to_string())
            }
            AttachmentError::Store(_) => Self::ExternalService(err.to_string()),
            AttachmentError::Repository(_) => Self::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_messages_name_mb() {
        let err = AttachmentError::batch_too_large(200 * 1024 * 1024);
        assert_eq!(
            err.to_string(),
            "Attachments exceed the maximum total size of 200 MB per message"
        );

        let err = AttachmentError::item_too_large(50 * 1024 * 1024);
        assert_eq!(
            err.to_string(),
            "Attachment exceeds the maximum size of 50 MB"
        );
    }

    #[test]
    fn test_app_error_classification() {
        let err: AppError = AttachmentError::batch_too_large(1024 * 1024).into();
        assert_eq!(err.status_code(), 400);

        let err: AppError = AttachmentError::NoPayload.into();
        assert_eq!(err.status_code(), 404);

        let err: AppError = AttachmentError::Store(StoreError::not_found("chat/a/b")).into();
        assert_eq!(err.status_code(), 404);

        let err: AppError = AttachmentError::Store(StoreError::operation("timeout")).into();
        assert_eq!(err.error_code(), "EXTERNAL_SERVICE_ERROR");

        let err: AppError = AttachmentError::repository("insert failed").into();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
