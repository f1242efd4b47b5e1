//! Shared test doubles for the playback test suites
#![allow(dead_code)]

use async_trait::async_trait;
use reelfeed_common::model::VideoEntry;
use reelfeed_player::catalog::VideoCatalog;
use reelfeed_player::config::EngineConfig;
use reelfeed_player::error::{Error, Result};
use reelfeed_player::playback::controller::SurfaceProvider;
use reelfeed_player::playback::surface::FeedSurface;
use reelfeed_player::playback::types::{
    BufferStats, EngineEvent, EngineFault, FaultKind,
};
use reelfeed_player::playback::{EngineFactory, MediaSurface, StreamEngine};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Control/observation handle for one fake engine instance
pub struct FakeEngineShared {
    pub src: String,
    destroyed: AtomicBool,
    start_loads: AtomicU32,
    stop_loads: AtomicU32,
    recoveries: AtomicU32,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl FakeEngineShared {
    /// Inject an engine event toward the owning session
    pub fn send(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    /// Shorthand: report a parsed manifest with a 10s media duration
    pub fn ready(&self) {
        self.send(EngineEvent::ManifestParsed {
            media_duration: Some(Duration::from_secs(10)),
        });
    }

    /// Shorthand: report a fatal fault of the given kind
    pub fn fault(&self, kind: FaultKind) {
        self.send(EngineEvent::Fault(EngineFault {
            kind,
            fatal: true,
            detail: format!("injected {:?} fault", kind),
        }));
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Relaxed)
    }

    pub fn start_loads(&self) -> u32 {
        self.start_loads.load(Ordering::Relaxed)
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries.load(Ordering::Relaxed)
    }
}

struct FakeEngine {
    shared: Arc<FakeEngineShared>,
}

impl StreamEngine for FakeEngine {
    fn start_load(&self) {
        self.shared.start_loads.fetch_add(1, Ordering::Relaxed);
    }

    fn stop_load(&self) {
        self.shared.stop_loads.fetch_add(1, Ordering::Relaxed);
    }

    fn recover_media(&self) {
        self.shared.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    fn destroy(&self) {
        self.shared.destroyed.store(true, Ordering::Relaxed);
    }

    fn buffer_stats(&self) -> BufferStats {
        BufferStats::default()
    }
}

/// Factory that records every engine it builds.
///
/// With `auto_ready` each engine reports a parsed manifest immediately,
/// letting sessions progress without manual event injection.
pub struct FakeEngineFactory {
    auto_ready: bool,
    engines: Mutex<Vec<Arc<FakeEngineShared>>>,
}

impl FakeEngineFactory {
    /// Engines stay silent until events are injected by hand
    pub fn new() -> Self {
        Self {
            auto_ready: false,
            engines: Mutex::new(Vec::new()),
        }
    }

    /// Engines report ManifestParsed on creation
    pub fn auto_ready() -> Self {
        Self {
            auto_ready: true,
            engines: Mutex::new(Vec::new()),
        }
    }

    /// Engine handle by creation order
    pub fn engine(&self, index: usize) -> Arc<FakeEngineShared> {
        Arc::clone(&self.engines.lock().unwrap()[index])
    }

    pub fn engine_count(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn last_engine(&self) -> Arc<FakeEngineShared> {
        let engines = self.engines.lock().unwrap();
        Arc::clone(engines.last().expect("no engines created"))
    }

    /// All engines created for a given manifest URL, in creation order
    pub fn engines_for(&self, src: &str) -> Vec<Arc<FakeEngineShared>> {
        self.engines
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.src == src)
            .cloned()
            .collect()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(
        &self,
        src: &str,
        _config: &EngineConfig,
        _surface: Arc<dyn MediaSurface>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Box<dyn StreamEngine> {
        let shared = Arc::new(FakeEngineShared {
            src: src.to_string(),
            destroyed: AtomicBool::new(false),
            start_loads: AtomicU32::new(0),
            stop_loads: AtomicU32::new(0),
            recoveries: AtomicU32::new(0),
            events: events.clone(),
        });

        if self.auto_ready {
            shared.ready();
        }

        self.engines.lock().unwrap().push(Arc::clone(&shared));
        Box::new(FakeEngine { shared })
    }
}

/// Scripted catalog collaborator
pub struct FakeCatalog {
    videos: Mutex<Vec<VideoEntry>>,
    fail: AtomicBool,
}

impl FakeCatalog {
    pub fn with_videos(videos: Vec<VideoEntry>) -> Self {
        Self {
            videos: Mutex::new(videos),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn set_videos(&self, videos: Vec<VideoEntry>) {
        *self.videos.lock().unwrap() = videos;
    }
}

#[async_trait]
impl VideoCatalog for FakeCatalog {
    async fn list_videos(&self, _user_id: Option<Uuid>) -> Result<Vec<VideoEntry>> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::Fetch("catalog unavailable".to_string()));
        }
        Ok(self.videos.lock().unwrap().clone())
    }

    async fn add_video(&self, src: &str) -> Result<VideoEntry> {
        let entry = VideoEntry {
            id: Uuid::new_v4(),
            src: src.to_string(),
            created_at: chrono::Utc::now(),
            title: None,
        };
        self.videos.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn remove_video(&self, id: Uuid) -> Result<()> {
        self.videos.lock().unwrap().retain(|v| v.id != id);
        Ok(())
    }
}

/// Surface provider that keeps handles to every surface it hands out
pub struct TestSurfaces {
    surfaces: Mutex<Vec<Arc<FeedSurface>>>,
}

impl TestSurfaces {
    pub fn new() -> Self {
        Self {
            surfaces: Mutex::new(Vec::new()),
        }
    }

    /// Surface by creation order (row index within one snapshot)
    pub fn surface(&self, index: usize) -> Arc<FeedSurface> {
        Arc::clone(&self.surfaces.lock().unwrap()[index])
    }

    pub fn count(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }
}

impl SurfaceProvider for TestSurfaces {
    fn create(
        &self,
        _index: usize,
        _item: &reelfeed_common::model::FeedItem,
    ) -> Arc<dyn MediaSurface> {
        let surface = Arc::new(FeedSurface::new(true));
        self.surfaces.lock().unwrap().push(Arc::clone(&surface));
        surface
    }
}

/// Deterministic catalog entry for tests
pub fn video_entry(n: u8) -> VideoEntry {
    VideoEntry {
        id: Uuid::from_bytes([n; 16]),
        src: format!("https://cdn.example.com/v{}/index.m3u8", n),
        created_at: chrono::Utc::now(),
        title: Some(format!("clip {}", n)),
    }
}

/// Poll until the condition holds; panics after 2 seconds
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}
