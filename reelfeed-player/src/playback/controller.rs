//! Feed controller
//!
//! Sole owner of the ordered item list and the current-row cursor. Wires
//! visibility transitions to session activation and to the preload
//! scheduler's target selection. The cursor only moves when a row crosses
//! into view; it is never decremented implicitly and every move is
//! validated against the snapshot bounds.

use crate::catalog::VideoCatalog;
use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::engine::EngineFactory;
use crate::playback::preload::PreloadScheduler;
use crate::playback::session::StreamSession;
use crate::playback::surface::{FeedSurface, MediaSurface};
use crate::playback::types::BufferStats;
use crate::playback::visibility::VisibilityTracker;
use crate::state::{CurrentRow, SharedState};
use reelfeed_common::events::PlayerEvent;
use reelfeed_common::model::{FeedItem, FeedPhase, PlaybackState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Creates one rendering surface per feed row.
pub trait SurfaceProvider: Send + Sync {
    fn create(&self, index: usize, item: &FeedItem) -> Arc<dyn MediaSurface>;
}

/// Default provider: one clock-driven surface per row.
#[derive(Default)]
pub struct FeedSurfaceProvider;

impl SurfaceProvider for FeedSurfaceProvider {
    fn create(&self, _index: usize, _item: &FeedItem) -> Arc<dyn MediaSurface> {
        Arc::new(FeedSurface::new(true))
    }
}

/// One vertically-snapped feed row
struct FeedRow {
    item: FeedItem,
    tracker: VisibilityTracker,
    session: StreamSession,
}

/// Feed state guarded by one async lock
struct FeedInner {
    rows: Vec<FeedRow>,
    current: Option<usize>,
    preload: PreloadScheduler,
}

/// Per-row status snapshot for the HTTP surface
#[derive(Debug, Clone, Serialize)]
pub struct RowStatus {
    pub index: usize,
    pub item_id: Uuid,
    pub state: PlaybackState,
    pub position_ms: u64,
    pub muted: bool,
    pub buffer: BufferStats,
}

/// Owns feed ordering, the cursor, and every row's session.
pub struct FeedController {
    catalog: Arc<dyn VideoCatalog>,
    factory: Arc<dyn EngineFactory>,
    surfaces: Arc<dyn SurfaceProvider>,
    config: PlayerConfig,
    bus: Arc<SharedState>,
    inner: Mutex<FeedInner>,
}

impl FeedController {
    pub fn new(
        catalog: Arc<dyn VideoCatalog>,
        factory: Arc<dyn EngineFactory>,
        surfaces: Arc<dyn SurfaceProvider>,
        config: PlayerConfig,
        bus: Arc<SharedState>,
    ) -> Self {
        let preload = PreloadScheduler::new(
            Arc::clone(&factory),
            config.engine.clone(),
            Arc::clone(&bus),
        );

        Self {
            catalog,
            factory,
            surfaces,
            config,
            bus,
            inner: Mutex::new(FeedInner {
                rows: Vec::new(),
                current: None,
                preload,
            }),
        }
    }

    /// Fetch the item list and install a fresh snapshot.
    ///
    /// The previous snapshot is torn down first, so a failed fetch leaves
    /// the error phase visible — never a stale list.
    pub async fn load(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown_locked(&mut inner).await;

        self.bus.set_items(Vec::new()).await;
        self.bus.set_current_row(None).await;
        self.bus.set_feed_phase(FeedPhase::Loading).await;

        let entries = match self.catalog.list_videos(None).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("video list fetch failed: {}", e);
                self.bus.set_feed_phase(FeedPhase::Error).await;
                self.bus.broadcast_event(PlayerEvent::FeedLoadFailed {
                    reason: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                return;
            }
        };

        // Persisted order is authoritative; no client-side resort
        let items: Vec<FeedItem> = entries.into_iter().map(FeedItem::from).collect();
        info!("feed loaded: {} items", items.len());

        self.bus.set_items(items.clone()).await;
        self.bus.broadcast_event(PlayerEvent::FeedLoaded {
            count: items.len(),
            timestamp: chrono::Utc::now(),
        });

        if items.is_empty() {
            self.bus.set_feed_phase(FeedPhase::Empty).await;
            return;
        }

        inner.rows = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let first = index == 0;
                let tracker = if first {
                    // No cold-start flicker while the first intersection
                    // measurement is still pending
                    VisibilityTracker::with_initial_in_view(self.config.visibility_threshold)
                } else {
                    VisibilityTracker::new(self.config.visibility_threshold)
                };
                let surface = self.surfaces.create(index, &item);
                let session = StreamSession::new(
                    item.id,
                    first,
                    self.config.engine.clone(),
                    Arc::clone(&self.factory),
                    surface,
                    Arc::clone(&self.bus),
                );
                FeedRow {
                    item,
                    tracker,
                    session,
                }
            })
            .collect();

        self.bus.set_feed_phase(FeedPhase::Ready).await;

        // The first row reports in view immediately
        self.enter_view_locked(&mut inner, 0).await;
    }

    /// Re-fetch the list wholesale
    pub async fn refresh(&self) {
        self.load().await;
    }

    /// Viewport intersection sample for one row.
    pub async fn report_visibility(&self, index: usize, ratio: f32) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let observation = inner
            .rows
            .get_mut(index)
            .ok_or(Error::RowOutOfBounds(index))?
            .tracker
            .observe(ratio);

        match observation {
            Some(true) => {
                self.enter_view_locked(&mut inner, index).await;
            }
            Some(false) => {
                let session = inner.rows[index].session.clone();
                session.set_visible(false).await;
            }
            // Same side of the threshold: nothing to do
            None => {}
        }

        Ok(())
    }

    /// Toggle audio on one row
    pub async fn toggle_mute(&self, index: usize) -> Result<()> {
        let inner = self.inner.lock().await;
        let row = inner
            .rows
            .get(index)
            .ok_or(Error::RowOutOfBounds(index))?;
        let session = row.session.clone();
        drop(inner);

        session.toggle_mute().await;
        Ok(())
    }

    /// Per-row status snapshot
    pub async fn row_statuses(&self) -> Vec<RowStatus> {
        let inner = self.inner.lock().await;
        let mut statuses = Vec::with_capacity(inner.rows.len());
        for (index, row) in inner.rows.iter().enumerate() {
            statuses.push(RowStatus {
                index,
                item_id: row.item.id,
                state: row.session.state().await,
                position_ms: row.session.position().as_millis() as u64,
                muted: row.session.muted(),
                buffer: row.session.buffer_stats().await,
            });
        }
        statuses
    }

    /// Preload target, if a preload engine is alive (test/status hook)
    pub async fn preload_target(&self) -> Option<usize> {
        self.inner.lock().await.preload.target()
    }

    /// Tear down every session and the preload engine
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown_locked(&mut inner).await;
    }

    /// A row crossed into view: move the cursor, reconcile session
    /// activation, and retarget the preload.
    async fn enter_view_locked(&self, inner: &mut FeedInner, index: usize) {
        if inner.current != Some(index) {
            self.set_current_locked(inner, index).await;
        }
        if let Some(row) = inner.rows.get(index) {
            row.session.set_visible(true).await;
        }
    }

    /// Move the cursor. Activation rule: the current row and the next row
    /// hold open sessions (the next row is primed but never playing);
    /// every other row is fully closed.
    async fn set_current_locked(&self, inner: &mut FeedInner, index: usize) {
        inner.current = Some(index);
        let item_id = inner.rows[index].item.id;

        info!(index, %item_id, "current row changed");
        self.bus
            .set_current_row(Some(CurrentRow { index, item_id }))
            .await;
        self.bus.broadcast_event(PlayerEvent::CurrentRowChanged {
            index,
            item_id,
            timestamp: chrono::Utc::now(),
        });

        for (i, row) in inner.rows.iter().enumerate() {
            let wanted = i == index || i == index + 1;
            let state = row.session.state().await;

            if wanted {
                // Single-focus rule: the cursor row is the only one
                // allowed to keep playing
                if i != index && state == PlaybackState::Playing {
                    row.session.set_visible(false).await;
                }
                let reopen = match state {
                    PlaybackState::Idle => true,
                    // Scrolling back onto a failed row grants a fresh
                    // rebuild budget
                    PlaybackState::Failed => i == index,
                    _ => false,
                };
                if reopen {
                    row.session.open(&row.item.src).await;
                }
            } else if state.holds_engine() {
                row.session.close().await;
            }
        }

        let items: Vec<FeedItem> = inner.rows.iter().map(|row| row.item.clone()).collect();
        inner.preload.retarget(index, &items);
    }

    async fn teardown_locked(&self, inner: &mut FeedInner) {
        for row in &inner.rows {
            row.session.close().await;
        }
        inner.rows.clear();
        inner.current = None;
        inner.preload.shutdown();
    }
}
