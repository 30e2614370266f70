//! Object store implementation using Apache OpenDAL.

use bytes::Bytes;
use chathub_shared::config::StorageSettings;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use opendal::{Operator, services};

use super::error::StoreError;

/// Stream of attachment bytes read from the store.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub file_size: u64,
    /// Content type reported by the backend, if any.
    pub content_type: Option<String>,
}

/// Vendor-agnostic object store for attachment bytes.
pub struct ObjectStore {
    operator: Operator,
    settings: StorageSettings,
}

impl ObjectStore {
    /// Create a new object store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_settings(settings: StorageSettings) -> Result<Self, StoreError> {
        let operator = Self::create_operator(&settings)?;
        Ok(Self { operator, settings })
    }

    /// Create OpenDAL operator from provider settings.
    fn create_operator(settings: &StorageSettings) -> Result<Operator, StoreError> {
        match settings {
            StorageSettings::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Ok(Operator::new(builder)
                    .map_err(|e| StoreError::configuration(e.to_string()))?
                    .finish())
            }
            StorageSettings::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Ok(Operator::new(builder)
                    .map_err(|e| StoreError::configuration(e.to_string()))?
                    .finish())
            }
            StorageSettings::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StoreError::configuration("invalid path"))?,
                );

                Ok(Operator::new(builder)
                    .map_err(|e| StoreError::configuration(e.to_string()))?
                    .finish())
            }
        }
    }

    /// Write an object under the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        self.operator
            .write(key, bytes)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Fetch size and content-type metadata for an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be accessed.
    pub async fn stat(&self, key: &str) -> Result<ObjectMetadata, StoreError> {
        let meta = self.operator.stat(key).await.map_err(StoreError::from)?;

        Ok(ObjectMetadata {
            file_size: meta.content_length(),
            content_type: meta.content_type().map(String::from),
        })
    }

    /// Read an object fully into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the read fails.
    pub async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let buffer = self.operator.read(key).await.map_err(StoreError::from)?;
        Ok(buffer.to_bytes())
    }

    /// Open a streaming reader over an object's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the reader cannot be
    /// opened.
    pub async fn bytes_stream(&self, key: &str) -> Result<ByteStream, StoreError> {
        let reader = self.operator.reader(key).await.map_err(StoreError::from)?;
        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(|e| StoreError::operation(e.to_string()))?;

        Ok(stream
            .map_err(|e| StoreError::operation(e.to_string()))
            .boxed())
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.operator.delete(key).await.map_err(StoreError::from)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.settings.provider_name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.settings.bucket()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_local_fs() {
        let store = ObjectStore::from_settings(StorageSettings::local_fs("./test-storage"))
            .expect("should create store");
        assert_eq!(store.provider_name(), "local");
    }

    #[test]
    fn test_from_settings_s3() {
        let store = ObjectStore::from_settings(StorageSettings::s3(
            "https://account.r2.cloudflarestorage.com",
            "chat-attachments",
            "access_key",
            "secret_key",
            "auto",
        ))
        .expect("should create store");
        assert_eq!(store.provider_name(), "s3");
        assert_eq!(store.bucket(), "chat-attachments");
    }

    #[test]
    fn test_from_settings_azure() {
        let store = ObjectStore::from_settings(StorageSettings::azure_blob(
            "chathubdev",
            "YWNjZXNzX2tleQ==",
            "attachments",
        ))
        .expect("should create store");
        assert_eq!(store.provider_name(), "azure_blob");
    }
}
