//! Shared service state
//!
//! Thread-safe shared state for coordination between the feed controller
//! and the HTTP surface, plus the event broadcast channel feeding SSE.

use reelfeed_common::events::PlayerEvent;
use reelfeed_common::model::{FeedItem, FeedPhase};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Snapshot of the current row, published for the HTTP surface
#[derive(Debug, Clone)]
pub struct CurrentRow {
    pub index: usize,
    pub item_id: Uuid,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Feed display phase
    pub feed_phase: RwLock<FeedPhase>,

    /// Current feed snapshot (replaced wholesale on refresh)
    pub items: RwLock<Vec<FeedItem>>,

    /// Current-row cursor (None until the first in-view transition)
    pub current_row: RwLock<Option<CurrentRow>>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            feed_phase: RwLock::new(FeedPhase::Loading),
            items: RwLock::new(Vec::new()),
            current_row: RwLock::new(None),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Get feed display phase
    pub async fn get_feed_phase(&self) -> FeedPhase {
        *self.feed_phase.read().await
    }

    /// Set feed display phase
    pub async fn set_feed_phase(&self, phase: FeedPhase) {
        *self.feed_phase.write().await = phase;
        self.broadcast_event(PlayerEvent::FeedPhaseChanged {
            phase,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Get current feed snapshot
    pub async fn get_items(&self) -> Vec<FeedItem> {
        self.items.read().await.clone()
    }

    /// Replace the feed snapshot wholesale
    pub async fn set_items(&self, items: Vec<FeedItem>) {
        *self.items.write().await = items;
    }

    /// Get current row cursor
    pub async fn get_current_row(&self) -> Option<CurrentRow> {
        self.current_row.read().await.clone()
    }

    /// Set current row cursor
    pub async fn set_current_row(&self, row: Option<CurrentRow>) {
        *self.current_row.write().await = row;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_phase() {
        let state = SharedState::new();

        // Default is Loading
        assert_eq!(state.get_feed_phase().await, FeedPhase::Loading);

        state.set_feed_phase(FeedPhase::Ready).await;
        assert_eq!(state.get_feed_phase().await, FeedPhase::Ready);
    }

    #[tokio::test]
    async fn test_phase_change_broadcasts() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.set_feed_phase(FeedPhase::Error).await;

        match rx.recv().await.unwrap() {
            PlayerEvent::FeedPhaseChanged { phase, .. } => {
                assert_eq!(phase, FeedPhase::Error)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_current_row() {
        let state = SharedState::new();
        assert!(state.get_current_row().await.is_none());

        let row = CurrentRow {
            index: 1,
            item_id: Uuid::new_v4(),
        };
        state.set_current_row(Some(row.clone())).await;
        assert_eq!(state.get_current_row().await.unwrap().index, 1);
    }
}
