//! Streaming engine abstraction
//!
//! An engine instance parses one manifest, fetches segments, and keeps a
//! bounded forward buffer against one surface. Sessions drive engines
//! through this seam; tests substitute scripted fakes.

use crate::config::EngineConfig;
use crate::playback::surface::MediaSurface;
use crate::playback::types::{BufferStats, EngineEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One live streaming engine instance.
///
/// All controls are signals: they return immediately and take effect in
/// the engine's loader task. Outcomes are reported as `EngineEvent`s on
/// the channel the engine was created with.
pub trait StreamEngine: Send + Sync {
    /// Begin or resume manifest/segment loading
    fn start_load(&self);

    /// Halt loading, keeping buffered media
    fn stop_load(&self);

    /// In-place decoder recovery: drop and refetch the most recent
    /// segment without reloading the manifest
    fn recover_media(&self);

    /// Release all resources. Idempotent; pending loader callbacks become
    /// no-ops once this returns.
    fn destroy(&self);

    /// Forward buffer occupancy
    fn buffer_stats(&self) -> BufferStats;
}

/// Constructs engine instances for sessions and the preload scheduler.
pub trait EngineFactory: Send + Sync {
    /// Build an engine bound to `src` and `surface`, reporting on
    /// `events`. The engine starts loading immediately.
    fn create(
        &self,
        src: &str,
        config: &EngineConfig,
        surface: Arc<dyn MediaSurface>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Box<dyn StreamEngine>;
}
