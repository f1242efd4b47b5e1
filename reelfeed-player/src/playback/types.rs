//! Engine-facing types shared across the playback subsystem

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monotonic engine instance counter per session.
///
/// Every engine event carries the generation it was issued under; events
/// tagged with a stale generation are discarded, so a callback from a torn
/// down engine can never mutate session state.
pub type Generation = u64;

/// Engine fault classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// Manifest or segment transport failure
    Network,
    /// Buffered media could not be decoded
    Media,
    /// Anything else; unrecoverable for the current engine instance
    Other,
}

/// Fault reported by an engine instance
#[derive(Debug, Clone)]
pub struct EngineFault {
    pub kind: FaultKind,
    /// Whether the engine stopped loading as a result
    pub fatal: bool,
    pub detail: String,
}

/// Events emitted by an engine instance toward its owning session
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Manifest fetched and parsed; the session may report Ready
    ManifestParsed {
        /// Total media duration when the playlist declares an endlist
        media_duration: Option<Duration>,
    },

    /// One segment landed in the forward buffer
    FragmentBuffered {
        sequence: u64,
        duration: Duration,
        bytes: usize,
    },

    /// Every segment of the playlist has been buffered
    EndOfStream,

    /// Engine fault, classified
    Fault(EngineFault),
}

/// Forward buffer occupancy snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Buffered media duration ahead of the playhead, in seconds
    pub forward_secs: f64,
    /// Total bytes held by the engine buffer
    pub bytes: usize,
}
