//! Attachment orchestration service.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use super::error::AttachmentError;
use super::types::{
    AttachmentLimits, AttachmentMetadata, AttachmentPayload, AttachmentRecord, OwnerScope,
    RawAttachment, RetrievedAttachment, ScopeQuery,
};
use crate::store::{ByteStream, ObjectMetadata, StoreError};

/// External binary store contract.
///
/// The platform's binary-data service owns the bytes; this trait is the full
/// surface the orchestrator needs from it. `store` decides the payload
/// representation: it may keep the data inline in the returned record or swap
/// in an opaque external id.
pub trait BinaryStore: Send + Sync {
    /// Durably store one attachment's bytes under the owner's scope and return
    /// the populated record.
    fn store(
        &self,
        scope: OwnerScope,
        bytes: Bytes,
        metadata: AttachmentMetadata,
    ) -> impl std::future::Future<Output = Result<AttachmentRecord, StoreError>> + Send;

    /// Fetch size metadata for an externally stored attachment.
    fn metadata(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<ObjectMetadata, StoreError>> + Send;

    /// Open a streaming reader over an externally stored attachment.
    fn open_stream(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<ByteStream, StoreError>> + Send;

    /// Read an externally stored attachment fully into memory.
    fn read_buffer(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Bytes, StoreError>> + Send;

    /// Delete a batch of externally stored attachments in one call.
    fn delete_many(
        &self,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// Repository view over owning entities' attachment records.
///
/// Implemented by the host platform's message/knowledge-item repositories;
/// used only by the administrative sweep operations.
pub trait AttachmentIndex: Send + Sync {
    /// All attachment records whose owners match the query.
    fn records_for(
        &self,
        query: &ScopeQuery,
    ) -> impl std::future::Future<Output = Result<Vec<AttachmentRecord>, AttachmentError>> + Send;

    /// All attachment records, unscoped.
    fn all_records(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<AttachmentRecord>, AttachmentError>> + Send;
}

/// Attachment orchestrator: validates size policy, delegates durable storage
/// to the external binary store, and supports buffer/stream retrieval and
/// best-effort cleanup.
///
/// All operations are plain async sequences with no internal locking; the
/// batch path stores strictly one attachment at a time to bound concurrent
/// write load on the store.
pub struct AttachmentService<S: BinaryStore, I: AttachmentIndex> {
    store: Arc<S>,
    index: Arc<I>,
    limits: AttachmentLimits,
}

impl<S: BinaryStore, I: AttachmentIndex> AttachmentService<S, I> {
    /// Create a new attachment service with the given size policy.
    #[must_use]
    pub fn new(store: Arc<S>, index: Arc<I>, limits: AttachmentLimits) -> Self {
        Self {
            store,
            index,
            limits,
        }
    }

    /// Store a batch of message attachments, strictly in input order.
    ///
    /// The running decoded total is checked against the aggregate cap before
    /// each store call; crossing it fails immediately. Attachments already
    /// stored by this call are NOT rolled back; the caller may sweep them via
    /// [`Self::delete_many`]. Message attachments carry no per-file cap, only
    /// the aggregate one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any payload is not decodable base64
    /// - The cumulative decoded size exceeds the aggregate cap
    /// - The binary store fails
    pub async fn store_batch(
        &self,
        scope: OwnerScope,
        attachments: Vec<RawAttachment>,
    ) -> Result<Vec<AttachmentRecord>, AttachmentError> {
        let mut records = Vec::with_capacity(attachments.len());
        let mut total_bytes: u64 = 0;

        for raw in attachments {
            let bytes = decode_payload(&raw.data)?;
            total_bytes =
                total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
            if total_bytes > self.limits.max_batch_total_bytes {
                return Err(AttachmentError::batch_too_large(
                    self.limits.max_batch_total_bytes,
                ));
            }

            let metadata =
                AttachmentMetadata::for_payload(&raw.file_name, &raw.mime_type, bytes.len());
            let record = self
                .store
                .store(scope, Bytes::from(bytes), metadata)
                .await?;
            records.push(record);
        }

        tracing::debug!(
            count = records.len(),
            scope = %scope.storage_prefix(),
            "stored message attachments"
        );
        Ok(records)
    }

    /// Store a single knowledge-item attachment.
    ///
    /// The per-item cap is enforced before any store call, so an oversized
    /// payload never reaches the backend. If the caller's subsequent durable
    /// record creation fails, it must call [`Self::discard`] on the returned
    /// record to avoid orphaned bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload is not decodable base64
    /// - The decoded size exceeds the per-item cap
    /// - The binary store fails
    pub async fn store_single(
        &self,
        scope: OwnerScope,
        attachment: RawAttachment,
    ) -> Result<AttachmentRecord, AttachmentError> {
        let bytes = decode_payload(&attachment.data)?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > self.limits.max_item_bytes {
            return Err(AttachmentError::item_too_large(self.limits.max_item_bytes));
        }

        let metadata = AttachmentMetadata::for_payload(
            &attachment.file_name,
            &attachment.mime_type,
            bytes.len(),
        );
        let record = self
            .store
            .store(scope, Bytes::from(bytes), metadata)
            .await?;

        tracing::debug!(scope = %scope.storage_prefix(), "stored knowledge-item attachment");
        Ok(record)
    }

    /// Retrieve an attachment's bytes.
    ///
    /// Externally stored payloads come back as a stream (with size metadata
    /// from the store) to avoid buffering large files; inline payloads are
    /// decoded into a buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the inline payload is undecodable or the store
    /// read fails.
    pub async fn retrieve(
        &self,
        record: &AttachmentRecord,
    ) -> Result<RetrievedAttachment, AttachmentError> {
        match &record.payload {
            AttachmentPayload::External { id, .. } => {
                let meta = self.store.metadata(id).await?;
                let stream = self.store.open_stream(id).await?;
                Ok(RetrievedAttachment::Stream {
                    stream,
                    file_size: meta.file_size,
                })
            }
            AttachmentPayload::Inline { data } => {
                let bytes = decode_payload(data)?;
                let file_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                Ok(RetrievedAttachment::Buffer {
                    buffer: Bytes::from(bytes),
                    file_size,
                })
            }
        }
    }

    /// Render an attachment as a `data:` URI.
    ///
    /// Idempotent: a record whose inline payload already is a `data:` URI is
    /// returned unchanged. The MIME type defaults to
    /// `application/octet-stream` when the record carries none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn to_data_url(&self, record: &AttachmentRecord) -> Result<String, AttachmentError> {
        let mime_type = record.mime_type_or_default();

        match &record.payload {
            AttachmentPayload::Inline { data } if data.starts_with("data:") => Ok(data.clone()),
            AttachmentPayload::Inline { data } => Ok(format!("data:{mime_type};base64,{data}")),
            AttachmentPayload::External { id, .. } => {
                let buffer = self.store.read_buffer(id).await?;
                Ok(format!(
                    "data:{mime_type};base64,{}",
                    STANDARD.encode(&buffer)
                ))
            }
        }
    }

    /// Delete the externally stored bytes of the given records.
    ///
    /// Inline-only records have nothing to delete externally and are skipped;
    /// with no external ids at all, no store call is issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the batched store delete fails.
    pub async fn delete_many(&self, records: &[AttachmentRecord]) -> Result<(), AttachmentError> {
        let ids = external_ids(records);
        if ids.is_empty() {
            return Ok(());
        }

        self.store.delete_many(&ids).await?;
        Ok(())
    }

    /// Administrative sweep: delete all stored attachments whose owners match
    /// the query. Non-transactional and irreversible; run after the relational
    /// transaction that removed the owning rows.
    ///
    /// Returns the number of externally stored attachments deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository load or the store delete fails.
    pub async fn delete_for_scope(&self, query: &ScopeQuery) -> Result<usize, AttachmentError> {
        let records = self.index.records_for(query).await?;
        self.sweep(records).await
    }

    /// Administrative sweep: delete every stored attachment, unscoped.
    ///
    /// Returns the number of externally stored attachments deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository load or the store delete fails.
    pub async fn delete_all(&self) -> Result<usize, AttachmentError> {
        let records = self.index.all_records().await?;
        self.sweep(records).await
    }

    async fn sweep(&self, records: Vec<AttachmentRecord>) -> Result<usize, AttachmentError> {
        let ids = external_ids(&records);
        if !ids.is_empty() {
            self.store.delete_many(&ids).await?;
        }

        tracing::info!(swept = ids.len(), "deleted stored attachments");
        Ok(ids.len())
    }

    /// Best-effort compensating delete after a failed durable-record creation.
    ///
    /// A failure here is logged at error level and swallowed so the caller's
    /// original error is what propagates. Inline records have no external
    /// bytes and are a no-op.
    pub async fn discard(&self, record: &AttachmentRecord) {
        let AttachmentPayload::External { id, .. } = &record.payload else {
            return;
        };

        if let Err(err) = self.store.delete_many(std::slice::from_ref(id)).await {
            tracing::error!(
                error = %err,
                attachment_id = %id,
                "failed to clean up stored attachment after create failure"
            );
        }
    }
}

/// Collect the external store ids carried by the given records.
fn external_ids(records: &[AttachmentRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| match &record.payload {
            AttachmentPayload::External { id, .. } => Some(id.clone()),
            AttachmentPayload::Inline { .. } => None,
        })
        .collect()
}

/// Decode a base64 attachment payload, tolerating a `data:` URI wrapper.
fn decode_payload(data: &str) -> Result<Vec<u8>, AttachmentError> {
    let encoded = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => data,
    };

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| AttachmentError::invalid_payload(e.to_string()))
}
