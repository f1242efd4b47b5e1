//! Playback coordination subsystem
//!
//! Session state machines over an engine abstraction, visibility
//! hysteresis, next-row preloading, and the feed controller that ties
//! them together.

pub mod controller;
pub mod engine;
pub mod hls;
pub mod preload;
pub mod session;
pub mod surface;
pub mod types;
pub mod visibility;

pub use controller::FeedController;
pub use engine::{EngineFactory, StreamEngine};
pub use hls::HlsEngineFactory;
pub use preload::PreloadScheduler;
pub use session::StreamSession;
pub use surface::{DetachedSurface, FeedSurface, MediaSurface, PlayRejected};
pub use visibility::VisibilityTracker;
