//! Core business logic for the Chat Hub attachment subsystem.
//!
//! This crate contains the attachment orchestration layer with ZERO web or
//! database dependencies. Persistence of owning entities (messages, knowledge
//! items) is the host platform's concern; this crate only mediates between
//! raw attachment payloads and the external binary store.
//!
//! # Modules
//!
//! - `attachment` - Attachment records, size policy, and the orchestrator service
//! - `store` - Vendor-agnostic object storage over Apache OpenDAL

pub mod attachment;
pub mod store;
