//! Entity synchronisation engine for deskbridge.
//!
//! This module mirrors remote helpdesk records locally, including:
//! - Whitelist-gated staging of field edits
//! - Save: custom-field writes, one update request, then a full refresh
//! - Refresh: wholesale replacement of local details, discarding staged edits
//! - Per-resource behaviour supplied as static `ResourceDescriptor` values

pub mod descriptor;
pub mod entity;
pub mod staging;
pub mod state;

// Re-export main types
pub use descriptor::{CustomField, CustomFieldTable, EditableField, EmptySave, ResourceDescriptor};
pub use entity::{parse_update_call, RemoteEntity};
pub use staging::StagedEdits;
pub use state::{Refreshed, SaveOutcome, SyncState};
