//! Object storage for attachment bytes using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! Provider selection and credentials come from
//! [`chathub_shared::config::StorageSettings`]; the rest of the crate talks to
//! [`ObjectStore`] in terms of opaque keys and byte buffers/streams.

mod error;
mod service;

pub use error::StoreError;
pub use service::{ByteStream, ObjectMetadata, ObjectStore};
