//! OpenDAL-backed binary store adapter.
//!
//! [`ObjectStore`] always stores externally: the returned record references
//! the object key as its opaque id, and the storage-mode sentinel is the
//! provider name.

use bytes::Bytes;
use uuid::Uuid;

use super::service::BinaryStore;
use super::types::{AttachmentMetadata, AttachmentRecord, OwnerScope};
use crate::store::{ByteStream, ObjectMetadata, ObjectStore, StoreError};

impl BinaryStore for ObjectStore {
    async fn store(
        &self,
        scope: OwnerScope,
        bytes: Bytes,
        metadata: AttachmentMetadata,
    ) -> Result<AttachmentRecord, StoreError> {
        let key = scope.object_key(Uuid::new_v4(), &metadata.file_name);
        self.put(&key, bytes).await?;
        Ok(AttachmentRecord::external(
            key,
            self.provider_name(),
            metadata,
        ))
    }

    async fn metadata(&self, id: &str) -> Result<ObjectMetadata, StoreError> {
        self.stat(id).await
    }

    async fn open_stream(&self, id: &str) -> Result<ByteStream, StoreError> {
        self.bytes_stream(id).await
    }

    async fn read_buffer(&self, id: &str) -> Result<Bytes, StoreError> {
        self.read(id).await
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }
}
