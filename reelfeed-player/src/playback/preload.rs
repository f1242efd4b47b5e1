//! Next-row preloading
//!
//! Warms the network and segment buffers for the row immediately after
//! the cursor by running a throwaway engine against a detached sink.
//! Playback never starts on the preload path. Strict lifetime rule: at
//! most one preload engine exists, and none outlives the cursor value
//! that created it.

use crate::config::EngineConfig;
use crate::playback::engine::{EngineFactory, StreamEngine};
use crate::playback::surface::DetachedSurface;
use crate::playback::types::EngineEvent;
use crate::state::SharedState;
use reelfeed_common::events::PlayerEvent;
use reelfeed_common::model::FeedItem;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

/// One live preload engine
struct PreloadSlot {
    index: usize,
    item_id: Uuid,
    engine: Box<dyn StreamEngine>,
    event_task: JoinHandle<()>,
}

/// Primes the row after the cursor.
pub struct PreloadScheduler {
    factory: Arc<dyn EngineFactory>,
    config: EngineConfig,
    bus: Arc<SharedState>,
    slot: Option<PreloadSlot>,
}

impl PreloadScheduler {
    pub fn new(factory: Arc<dyn EngineFactory>, config: EngineConfig, bus: Arc<SharedState>) -> Self {
        Self {
            factory,
            config,
            bus,
            slot: None,
        }
    }

    /// Row index currently being warmed, if any
    pub fn target(&self) -> Option<usize> {
        self.slot.as_ref().map(|slot| slot.index)
    }

    /// React to a cursor change: the previous preload engine is destroyed
    /// unconditionally, and a new one is built for `current_index + 1`
    /// when that row exists.
    pub fn retarget(&mut self, current_index: usize, items: &[FeedItem]) {
        self.discard();

        let next_index = current_index + 1;
        let Some(item) = items.get(next_index) else {
            return; // end of list, nothing to warm
        };

        debug!(index = next_index, item_id = %item.id, "preloading next row");

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = self.factory.create(
            &item.src,
            &self.config,
            Arc::new(DetachedSurface::new()),
            tx,
        );

        let item_id = item.id;
        let event_task = tokio::spawn(drain_events(item_id, rx));

        self.slot = Some(PreloadSlot {
            index: next_index,
            item_id,
            engine,
            event_task,
        });

        self.bus.broadcast_event(PlayerEvent::PreloadStarted {
            index: next_index,
            item_id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Destroy the current preload engine, if any
    pub fn discard(&mut self) {
        if let Some(slot) = self.slot.take() {
            debug!(index = slot.index, item_id = %slot.item_id, "discarding preload engine");
            slot.engine.destroy();
            slot.event_task.abort();
            self.bus.broadcast_event(PlayerEvent::PreloadDiscarded {
                index: slot.index,
                item_id: slot.item_id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Unconditional teardown on component shutdown
    pub fn shutdown(&mut self) {
        self.discard();
    }
}

impl Drop for PreloadScheduler {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.engine.destroy();
            slot.event_task.abort();
        }
    }
}

/// Preload engines have no session; their events are trace-logged and
/// otherwise dropped.
async fn drain_events(item_id: Uuid, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::FragmentBuffered {
                sequence, bytes, ..
            } => {
                trace!(%item_id, sequence, bytes, "preload fragment buffered");
            }
            EngineEvent::ManifestParsed { .. } => {
                trace!(%item_id, "preload manifest parsed");
            }
            EngineEvent::EndOfStream => {
                trace!(%item_id, "preload buffer complete");
            }
            EngineEvent::Fault(fault) => {
                // Best-effort warmup; faults are not recovered here
                debug!(%item_id, kind = ?fault.kind, detail = %fault.detail, "preload fault ignored");
            }
        }
    }
}
