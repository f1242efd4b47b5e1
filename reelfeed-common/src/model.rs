//! Feed data model and playback state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a feed snapshot.
///
/// Immutable once loaded; the feed list is replaced wholesale on refresh,
/// never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable identifier, unique within a feed
    pub id: Uuid,

    /// URL of the HLS manifest for this item
    pub src: String,
}

/// Catalog record as returned by the video-listing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    pub id: Uuid,
    pub src: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<VideoEntry> for FeedItem {
    fn from(entry: VideoEntry) -> Self {
        Self {
            id: entry.id,
            src: entry.src,
        }
    }
}

/// Lifecycle state of one stream session.
///
/// Transitions are driven by `open`/`close`, visibility changes, and
/// engine events. Illegal transitions are no-ops, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No engine bound
    Idle,
    /// Engine constructed, manifest load in flight
    Attaching,
    /// Manifest parsed, playback not yet requested
    Ready,
    Playing,
    Paused,
    /// Engine fault recovery in progress
    Recovering,
    /// Engine gave up after bounded reconstruction attempts
    Failed,
}

impl PlaybackState {
    /// States in which an engine instance is live against the surface.
    pub fn holds_engine(&self) -> bool {
        matches!(
            self,
            PlaybackState::Attaching
                | PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Recovering
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Attaching => write!(f, "attaching"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Recovering => write!(f, "recovering"),
            PlaybackState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal display state of the feed container.
///
/// `Loading`, `Error`, and `Empty` each render distinctly; a blank feed is
/// never shown silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    Loading,
    Error,
    Empty,
    Ready,
}

impl std::fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedPhase::Loading => write!(f, "loading"),
            FeedPhase::Error => write!(f, "error"),
            FeedPhase::Empty => write!(f, "empty"),
            FeedPhase::Ready => write!(f, "ready"),
        }
    }
}
