//! Application configuration management.

use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Binary storage backend configuration.
    pub storage: StorageSettings,
    /// Attachment size policy.
    #[serde(default)]
    pub attachments: AttachmentSettings,
}

/// Binary storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageSettings {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageSettings {
    /// Create S3-compatible settings (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage settings.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem settings (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name recorded on stored attachments.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
        }
    }
}

/// Attachment size policy settings.
///
/// Defaults match the platform policy: 200 MiB aggregate per message batch,
/// 50 MiB per knowledge-item attachment.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AttachmentSettings {
    /// Aggregate cap across all attachments in a single batch store call.
    #[serde(default = "default_max_batch_total_bytes")]
    pub max_batch_total_bytes: u64,
    /// Per-item cap for knowledge-item attachments.
    #[serde(default = "default_max_item_bytes")]
    pub max_item_bytes: u64,
}

fn default_max_batch_total_bytes() -> u64 {
    200 * 1024 * 1024
}

fn default_max_item_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            max_batch_total_bytes: default_max_batch_total_bytes(),
            max_item_bytes: default_max_item_bytes(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CHATHUB").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_storage_settings_s3() {
        let settings = StorageSettings::s3(
            "https://account.r2.cloudflarestorage.com",
            "chat-attachments",
            "access_key",
            "secret_key",
            "auto",
        );
        assert_eq!(settings.provider_name(), "s3");
        assert_eq!(settings.bucket(), "chat-attachments");
    }

    #[test]
    fn test_storage_settings_azure() {
        let settings = StorageSettings::azure_blob("chathubdev", "access_key", "attachments");
        assert_eq!(settings.provider_name(), "azure_blob");
        assert_eq!(settings.bucket(), "attachments");
    }

    #[test]
    fn test_storage_settings_local() {
        let settings = StorageSettings::local_fs("./storage");
        assert_eq!(settings.provider_name(), "local");
    }

    #[test]
    fn test_storage_settings_deserialize_tagged() {
        let json = r#"{ "type": "local_fs", "root": "./dev-storage" }"#;
        let settings: StorageSettings = serde_json::from_str(json).expect("valid settings");
        assert_eq!(settings.provider_name(), "local");
    }

    #[test]
    fn test_attachment_settings_defaults() {
        let settings = AttachmentSettings::default();
        assert_eq!(settings.max_batch_total_bytes, 200 * 1024 * 1024);
        assert_eq!(settings.max_item_bytes, 50 * 1024 * 1024);
    }

    #[rstest]
    #[case(r#"{}"#, 200 * 1024 * 1024, 50 * 1024 * 1024)]
    #[case(r#"{ "max_batch_total_bytes": 1024 }"#, 1024, 50 * 1024 * 1024)]
    #[case(r#"{ "max_item_bytes": 2048 }"#, 200 * 1024 * 1024, 2048)]
    fn test_attachment_settings_partial_override(
        #[case] json: &str,
        #[case] expected_batch: u64,
        #[case] expected_item: u64,
    ) {
        let settings: AttachmentSettings = serde_json::from_str(json).expect("valid settings");
        assert_eq!(settings.max_batch_total_bytes, expected_batch);
        assert_eq!(settings.max_item_bytes, expected_item);
    }
}
