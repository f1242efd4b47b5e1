//! reelfeed-player specific configuration

use std::time::Duration;

/// Player service configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Address the HTTP surface binds to
    pub bind_addr: String,

    /// Base URL of the video-listing collaborator
    pub catalog_url: String,

    /// Intersection ratio at which a row counts as in view
    pub visibility_threshold: f32,

    /// Engine tuning shared by active and preload sessions
    pub engine: EngineConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5760".to_string(),
            catalog_url: "http://localhost:8000".to_string(),
            visibility_threshold: 0.7,
            engine: EngineConfig::default(),
        }
    }
}

/// Tuning for one engine instance.
///
/// Buffer bounds are per instance, not pooled: the preload engine and the
/// active engine each carry their own budget.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Forward buffer the loader tries to keep ahead of the playhead
    pub target_forward_buffer: Duration,

    /// Hard cap on buffered media duration
    pub max_forward_buffer: Duration,

    /// Hard cap on total buffered bytes per engine instance
    pub max_buffer_bytes: usize,

    /// Buffered media kept behind the playhead before eviction
    pub back_buffer: Duration,

    /// Timeout for a single manifest or segment request
    pub request_timeout: Duration,

    /// Maximum retry attempts for a failed manifest or segment request
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    pub retry_base_delay: Duration,

    /// Cap for exponential backoff growth
    pub max_retry_delay: Duration,

    /// Engine rebuilds allowed per session before it parks in Failed
    pub max_engine_rebuilds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_forward_buffer: Duration::from_secs(30),
            max_forward_buffer: Duration::from_secs(600),
            max_buffer_bytes: 60 * 1024 * 1024,
            back_buffer: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
            max_engine_rebuilds: 3,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_forward_buffer(mut self, v: Duration) -> Self {
        self.target_forward_buffer = v;
        self
    }

    pub fn max_forward_buffer(mut self, v: Duration) -> Self {
        self.max_forward_buffer = v;
        self
    }

    pub fn max_buffer_bytes(mut self, v: usize) -> Self {
        self.max_buffer_bytes = v;
        self
    }

    pub fn back_buffer(mut self, v: Duration) -> Self {
        self.back_buffer = v;
        self
    }

    pub fn request_timeout(mut self, v: Duration) -> Self {
        self.request_timeout = v;
        self
    }

    pub fn max_retries(mut self, v: u32) -> Self {
        self.max_retries = v;
        self
    }

    pub fn max_engine_rebuilds(mut self, v: u32) -> Self {
        self.max_engine_rebuilds = v;
        self
    }
}
