//! Lifecycle state of a mirrored entity.

use std::fmt;

/// Sync state of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// First fetch in progress; never observable once construction returns.
    Loading,
    /// Details reflect the last refresh, plus any staged edits.
    Synced,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Loading => f.write_str("loading"),
            SyncState::Synced => f.write_str("synced"),
        }
    }
}

/// Result of a refresh round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refreshed {
    /// Details were replaced with the server's record.
    Updated,
    /// The server returned no usable record; details are unchanged.
    Empty,
}

/// Result of `save()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was staged and the resource skips empty saves.
    Unchanged,
    /// Changes were sent and the entity was refreshed.
    Saved {
        /// Fields sent in the update request, in payload order.
        fields: Vec<String>,
        /// Fields written through the custom-field endpoint.
        custom_fields: Vec<String>,
        refreshed: Refreshed,
    },
}

impl SaveOutcome {
    /// Whether the post-save refresh found no record.
    pub fn lost_record(&self) -> bool {
        matches!(
            self,
            SaveOutcome::Saved {
                refreshed: Refreshed::Empty,
                ..
            }
        )
    }
}
