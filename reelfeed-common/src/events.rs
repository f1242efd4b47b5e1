//! Event types for the reelfeed event system

use crate::model::{FeedPhase, PlaybackState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player event types
///
/// Broadcast from the playback service to all SSE listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Feed snapshot replaced after a catalog fetch
    FeedLoaded {
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Catalog fetch failed; feed is in the error phase
    FeedLoadFailed {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Feed display phase changed
    FeedPhaseChanged {
        phase: FeedPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Current-row cursor moved
    CurrentRowChanged {
        index: usize,
        item_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session crossed a lifecycle boundary
    SessionStateChanged {
        item_id: Uuid,
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback start was rejected by the hosting surface (autoplay policy)
    PlaybackRejected {
        item_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session exhausted its engine rebuild budget
    SessionFailed {
        item_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Mute state toggled on a row
    MuteChanged {
        item_id: Uuid,
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Preload engine constructed for the row after the cursor
    PreloadStarted {
        index: usize,
        item_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Preload engine torn down (cursor moved or shutdown)
    PreloadDiscarded {
        index: usize,
        item_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event type string for the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            PlayerEvent::FeedLoaded { .. } => "FeedLoaded",
            PlayerEvent::FeedLoadFailed { .. } => "FeedLoadFailed",
            PlayerEvent::FeedPhaseChanged { .. } => "FeedPhaseChanged",
            PlayerEvent::CurrentRowChanged { .. } => "CurrentRowChanged",
            PlayerEvent::SessionStateChanged { .. } => "SessionStateChanged",
            PlayerEvent::PlaybackRejected { .. } => "PlaybackRejected",
            PlayerEvent::SessionFailed { .. } => "SessionFailed",
            PlayerEvent::MuteChanged { .. } => "MuteChanged",
            PlayerEvent::PreloadStarted { .. } => "PreloadStarted",
            PlayerEvent::PreloadDiscarded { .. } => "PreloadDiscarded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = PlayerEvent::CurrentRowChanged {
            index: 2,
            item_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"CurrentRowChanged\""));
        assert!(json.contains("\"index\":2"));
    }

    #[test]
    fn test_type_str_matches_variant() {
        let event = PlayerEvent::FeedLoadFailed {
            reason: "connection refused".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(event.type_str(), "FeedLoadFailed");
    }
}
