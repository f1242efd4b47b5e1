//! Stream session state machine
//!
//! Binds exactly one engine instance to exactly one manifest URL and one
//! rendering surface, and keeps playback consistent with a visibility
//! flag. Engine events are handled on a per-engine task; every engine
//! carries a generation number and events from a stale generation are
//! discarded, so teardown races cannot mutate live state.

use crate::config::EngineConfig;
use crate::playback::engine::{EngineFactory, StreamEngine};
use crate::playback::surface::MediaSurface;
use crate::playback::types::{BufferStats, EngineEvent, EngineFault, FaultKind, Generation};
use crate::state::SharedState;
use reelfeed_common::events::PlayerEvent;
use reelfeed_common::model::PlaybackState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mutable session state, serialized behind one async lock
struct SessionCore {
    state: PlaybackState,
    generation: Generation,
    engine: Option<Box<dyn StreamEngine>>,
    src: Option<String>,
    /// Last visibility level reported by the controller
    visible: bool,
    /// In-place recoveries (load resume / decoder reset) since the last
    /// loading progress
    in_place_recoveries: u32,
    /// Engine reconstructions since open()
    rebuilds: u32,
    event_task: Option<JoinHandle<()>>,
}

/// Fields shared between the session handle and its event tasks
struct SessionShared {
    item_id: Uuid,
    config: EngineConfig,
    factory: Arc<dyn EngineFactory>,
    surface: Arc<dyn MediaSurface>,
    bus: Arc<SharedState>,
    core: Mutex<SessionCore>,
}

/// One feed row's playback session.
///
/// Cheap to clone; all clones drive the same underlying state.
#[derive(Clone)]
pub struct StreamSession {
    shared: Arc<SessionShared>,
}

impl StreamSession {
    /// Create an idle session for one feed row.
    ///
    /// The first row of a feed starts unmuted; every other row starts
    /// muted.
    pub fn new(
        item_id: Uuid,
        first_in_feed: bool,
        config: EngineConfig,
        factory: Arc<dyn EngineFactory>,
        surface: Arc<dyn MediaSurface>,
        bus: Arc<SharedState>,
    ) -> Self {
        surface.set_muted(!first_in_feed);

        Self {
            shared: Arc::new(SessionShared {
                item_id,
                config,
                factory,
                surface,
                bus,
                core: Mutex::new(SessionCore {
                    state: PlaybackState::Idle,
                    generation: 0,
                    engine: None,
                    src: None,
                    visible: false,
                    in_place_recoveries: 0,
                    rebuilds: 0,
                    event_task: None,
                }),
            }),
        }
    }

    pub fn item_id(&self) -> Uuid {
        self.shared.item_id
    }

    pub fn surface(&self) -> Arc<dyn MediaSurface> {
        Arc::clone(&self.shared.surface)
    }

    pub async fn state(&self) -> PlaybackState {
        self.shared.core.lock().await.state
    }

    pub async fn generation(&self) -> Generation {
        self.shared.core.lock().await.generation
    }

    pub async fn buffer_stats(&self) -> BufferStats {
        self.shared
            .core
            .lock()
            .await
            .engine
            .as_ref()
            .map(|e| e.buffer_stats())
            .unwrap_or_default()
    }

    /// Playhead position on the bound surface
    pub fn position(&self) -> Duration {
        self.shared.surface.position()
    }

    pub fn muted(&self) -> bool {
        self.shared.surface.muted()
    }

    /// Bind the session to a manifest URL.
    ///
    /// Any previously attached engine is fully torn down first; two live
    /// engines never overlap on one surface. When the surface plays the
    /// format natively the engine is skipped and the URL is assigned
    /// directly.
    pub async fn open(&self, src: &str) {
        let mut core = self.shared.core.lock().await;
        Self::teardown_locked(&mut core);

        core.generation += 1;
        core.src = Some(src.to_string());
        core.rebuilds = 0;
        core.in_place_recoveries = 0;

        if self.shared.surface.supports_native(src) {
            debug!(item_id = %self.shared.item_id, "surface plays stream natively, skipping engine");
            self.shared.surface.set_native_source(src);
            self.transition_locked(&mut core, PlaybackState::Ready);
            if core.visible {
                self.try_play_locked(&mut core);
            }
            return;
        }

        self.attach_engine_locked(&mut core, src.to_string());
        self.transition_locked(&mut core, PlaybackState::Attaching);
    }

    /// Drive playback from the row's visibility level.
    ///
    /// In view: play from the current position once the session is ready;
    /// while the manifest is still loading the intent is queued. Out of
    /// view: pause and rewind to 0 so re-entering always restarts.
    pub async fn set_visible(&self, visible: bool) {
        let mut core = self.shared.core.lock().await;
        if core.visible == visible {
            return; // level-triggered; repeats are no-ops
        }
        core.visible = visible;

        if visible {
            match core.state {
                PlaybackState::Ready | PlaybackState::Paused => {
                    self.try_play_locked(&mut core);
                }
                // Intent stays queued and is honored on Ready
                PlaybackState::Attaching | PlaybackState::Recovering => {}
                PlaybackState::Playing | PlaybackState::Idle | PlaybackState::Failed => {}
            }
        } else {
            match core.state {
                PlaybackState::Playing => {
                    self.shared.surface.pause();
                    self.shared.surface.rewind();
                    self.transition_locked(&mut core, PlaybackState::Paused);
                }
                PlaybackState::Ready | PlaybackState::Paused => {
                    self.shared.surface.pause();
                    self.shared.surface.rewind();
                }
                _ => {}
            }
        }
    }

    pub async fn set_muted(&self, muted: bool) {
        let mut core = self.shared.core.lock().await;
        self.shared.surface.set_muted(muted);
        self.shared.bus.broadcast_event(PlayerEvent::MuteChanged {
            item_id: self.shared.item_id,
            muted,
            timestamp: chrono::Utc::now(),
        });

        // A mute toggle is a user gesture; retry playback that an
        // autoplay policy rejected earlier
        if core.visible
            && matches!(core.state, PlaybackState::Ready | PlaybackState::Paused)
        {
            self.try_play_locked(&mut core);
        }
    }

    pub async fn toggle_mute(&self) {
        let muted = !self.shared.surface.muted();
        self.set_muted(muted).await;
    }

    /// Release the engine and detach from the surface.
    ///
    /// Idempotent; safe from unmount, source change, and refresh paths.
    pub async fn close(&self) {
        let mut core = self.shared.core.lock().await;
        Self::teardown_locked(&mut core);
        core.generation += 1;
        core.src = None;
        self.shared.surface.detach();
        if core.state != PlaybackState::Idle {
            self.transition_locked(&mut core, PlaybackState::Idle);
        }
    }

    /// Destroy the engine and stop the event task. Core lock must be held.
    fn teardown_locked(core: &mut SessionCore) {
        if let Some(engine) = core.engine.take() {
            engine.destroy();
        }
        if let Some(task) = core.event_task.take() {
            task.abort();
        }
    }

    /// Construct an engine for `src` and start its event task.
    ///
    /// Callers transition the FSM themselves: `Attaching` on a fresh
    /// open, `Recovering` on a rebuild.
    fn attach_engine_locked(&self, core: &mut SessionCore, src: String) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = self.shared.factory.create(
            &src,
            &self.shared.config,
            Arc::clone(&self.shared.surface),
            tx,
        );
        core.engine = Some(engine);

        let shared = Arc::clone(&self.shared);
        let generation = core.generation;
        core.event_task = Some(tokio::spawn(async move {
            run_event_loop(shared, generation, rx).await;
        }));
    }

    /// Attempt playback; autoplay rejection is swallowed and logged.
    fn try_play_locked(&self, core: &mut SessionCore) {
        match self.shared.surface.play() {
            Ok(()) => {
                self.transition_locked(core, PlaybackState::Playing);
            }
            Err(rejected) => {
                // Autoplay denial: stay Ready/Paused and wait for the
                // next user-visible trigger
                info!(item_id = %self.shared.item_id, "{}", rejected);
                self.shared.bus.broadcast_event(PlayerEvent::PlaybackRejected {
                    item_id: self.shared.item_id,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    fn transition_locked(&self, core: &mut SessionCore, state: PlaybackState) {
        if core.state == state {
            return;
        }
        debug!(
            item_id = %self.shared.item_id,
            from = %core.state,
            to = %state,
            "session state"
        );
        core.state = state;
        self.shared
            .bus
            .broadcast_event(PlayerEvent::SessionStateChanged {
                item_id: self.shared.item_id,
                state,
                timestamp: chrono::Utc::now(),
            });
    }
}

/// Per-engine event task: applies engine events under the core lock,
/// discarding anything from a stale generation.
async fn run_event_loop(
    shared: Arc<SessionShared>,
    generation: Generation,
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = rx.recv().await {
        let mut core = shared.core.lock().await;
        if core.generation != generation {
            // A newer engine owns the session; this one is history
            return;
        }
        handle_engine_event(&shared, &mut core, event);
    }
}

fn handle_engine_event(shared: &Arc<SessionShared>, core: &mut SessionCore, event: EngineEvent) {
    let session = StreamSession {
        shared: Arc::clone(shared),
    };

    match event {
        EngineEvent::ManifestParsed { media_duration } => {
            core.in_place_recoveries = 0;
            shared.surface.set_duration(media_duration);
            if matches!(
                core.state,
                PlaybackState::Attaching | PlaybackState::Recovering
            ) {
                session.transition_locked(core, PlaybackState::Ready);
                if core.visible {
                    session.try_play_locked(core);
                }
            }
        }

        EngineEvent::FragmentBuffered {
            sequence, bytes, ..
        } => {
            core.in_place_recoveries = 0;
            debug!(item_id = %shared.item_id, sequence, bytes, "fragment buffered");
        }

        EngineEvent::EndOfStream => {
            debug!(item_id = %shared.item_id, "forward buffer complete");
        }

        EngineEvent::Fault(fault) => {
            handle_fault(&session, core, fault);
        }
    }
}

/// Classified fault recovery.
///
/// Network faults resume loading in place; media faults run decoder
/// recovery in place; anything else (or in-place recovery that keeps
/// failing) destroys and reconstructs the engine against the same
/// manifest, bounded by the rebuild budget.
fn handle_fault(session: &StreamSession, core: &mut SessionCore, fault: EngineFault) {
    let shared = &session.shared;

    if !fault.fatal {
        debug!(item_id = %shared.item_id, kind = ?fault.kind, detail = %fault.detail, "non-fatal engine fault");
        return;
    }

    warn!(
        item_id = %shared.item_id,
        kind = ?fault.kind,
        detail = %fault.detail,
        "fatal engine fault"
    );

    let in_place_budget_left = core.in_place_recoveries < shared.config.max_engine_rebuilds;

    match fault.kind {
        FaultKind::Network if in_place_budget_left => {
            core.in_place_recoveries += 1;
            if core.state == PlaybackState::Attaching {
                session.transition_locked(core, PlaybackState::Recovering);
            }
            if let Some(engine) = core.engine.as_ref() {
                engine.start_load();
            }
        }
        FaultKind::Media if in_place_budget_left => {
            core.in_place_recoveries += 1;
            if core.state == PlaybackState::Attaching {
                session.transition_locked(core, PlaybackState::Recovering);
            }
            if let Some(engine) = core.engine.as_ref() {
                engine.recover_media();
            }
        }
        _ => rebuild_engine(session, core, &fault),
    }
}

/// Destroy the engine and construct a fresh one bound to the same
/// manifest. Bounded; past the budget the session parks in Failed.
fn rebuild_engine(session: &StreamSession, core: &mut SessionCore, fault: &EngineFault) {
    let shared = &session.shared;

    StreamSession::teardown_locked(core);
    core.generation += 1;
    // The surface starves without an engine; halt the playhead until the
    // replacement is ready
    shared.surface.pause();

    if core.rebuilds >= shared.config.max_engine_rebuilds {
        warn!(
            item_id = %shared.item_id,
            rebuilds = core.rebuilds,
            "engine rebuild budget exhausted"
        );
        session.transition_locked(core, PlaybackState::Failed);
        shared.bus.broadcast_event(PlayerEvent::SessionFailed {
            item_id: shared.item_id,
            reason: fault.detail.clone(),
            timestamp: chrono::Utc::now(),
        });
        return;
    }

    core.rebuilds += 1;
    core.in_place_recoveries = 0;

    let Some(src) = core.src.clone() else {
        session.transition_locked(core, PlaybackState::Idle);
        return;
    };

    info!(
        item_id = %shared.item_id,
        rebuild = core.rebuilds,
        "reconstructing engine"
    );
    session.attach_engine_locked(core, src);
    session.transition_locked(core, PlaybackState::Recovering);
}
