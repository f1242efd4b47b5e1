//! Rendering surface abstraction
//!
//! The surface is the platform's media output sink. The playback service
//! does not decode or render; it tracks the playhead against a clock and
//! lets the hosting view layer observe state. Sessions and engines talk to
//! the surface through this trait so tests can substitute their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Playback start was denied by the hosting environment (autoplay policy).
///
/// Swallowed by the session: logged, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayRejected;

impl std::fmt::Display for PlayRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "playback start rejected by surface")
    }
}

impl std::error::Error for PlayRejected {}

/// One exclusive media output sink.
///
/// Exactly one engine instance may be attached at a time; the session
/// serializes open/close so two live engines never share a surface.
pub trait MediaSurface: Send + Sync {
    /// Whether the surface can play the stream format without an engine.
    ///
    /// When true the session assigns the manifest URL directly and skips
    /// engine construction; the surface's own error reporting applies.
    fn supports_native(&self, src: &str) -> bool;

    /// Bind a manifest URL directly (native playback path)
    fn set_native_source(&self, src: &str);

    /// Begin or resume playback from the current position
    fn play(&self) -> std::result::Result<(), PlayRejected>;

    /// Halt playback, keeping the current position
    fn pause(&self);

    /// Reset the playhead to 0
    fn rewind(&self);

    /// Current playhead position
    fn position(&self) -> Duration;

    fn set_muted(&self, muted: bool);

    fn muted(&self) -> bool;

    /// Media duration once known; rows loop over it
    fn set_duration(&self, _duration: Option<Duration>) {}

    /// Release any source binding; safe to call repeatedly
    fn detach(&self);
}

/// Playhead clock state
#[derive(Debug)]
struct Clock {
    playing: bool,
    base: Duration,
    started_at: Option<Instant>,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(at) if self.playing => self.base + at.elapsed(),
            _ => self.base,
        }
    }
}

/// Clock-driven surface bound to one feed row.
///
/// Position advances in real time while playing and wraps at the media
/// duration, matching the looping behavior of a feed row.
pub struct FeedSurface {
    clock: Mutex<Clock>,
    duration: Mutex<Option<Duration>>,
    native_src: Mutex<Option<String>>,
    muted: AtomicBool,
    autoplay_allowed: AtomicBool,
}

impl FeedSurface {
    /// Create a surface; `muted` sets the initial audio state.
    pub fn new(muted: bool) -> Self {
        Self {
            clock: Mutex::new(Clock {
                playing: false,
                base: Duration::ZERO,
                started_at: None,
            }),
            duration: Mutex::new(None),
            native_src: Mutex::new(None),
            muted: AtomicBool::new(muted),
            autoplay_allowed: AtomicBool::new(true),
        }
    }

    /// Simulate the hosting environment's autoplay policy.
    ///
    /// When disallowed, `play()` fails with `PlayRejected` until a user
    /// gesture (mute toggle) re-enables it.
    pub fn set_autoplay_allowed(&self, allowed: bool) {
        self.autoplay_allowed.store(allowed, Ordering::Relaxed);
    }

    /// URL bound via the native playback path, if any
    pub fn native_source(&self) -> Option<String> {
        self.native_src.lock().unwrap().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.lock().unwrap().playing
    }
}

impl Default for FeedSurface {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MediaSurface for FeedSurface {
    fn supports_native(&self, _src: &str) -> bool {
        false
    }

    fn set_native_source(&self, src: &str) {
        *self.native_src.lock().unwrap() = Some(src.to_string());
    }

    fn play(&self) -> std::result::Result<(), PlayRejected> {
        if !self.autoplay_allowed.load(Ordering::Relaxed) {
            return Err(PlayRejected);
        }
        let mut clock = self.clock.lock().unwrap();
        if !clock.playing {
            clock.playing = true;
            clock.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&self) {
        let mut clock = self.clock.lock().unwrap();
        if clock.playing {
            clock.base = clock.elapsed();
            clock.playing = false;
            clock.started_at = None;
        }
    }

    fn rewind(&self) {
        let mut clock = self.clock.lock().unwrap();
        clock.base = Duration::ZERO;
        if clock.playing {
            clock.started_at = Some(Instant::now());
        }
    }

    fn position(&self) -> Duration {
        let elapsed = self.clock.lock().unwrap().elapsed();
        match *self.duration.lock().unwrap() {
            // Rows loop: wrap the playhead at the media duration
            Some(total) if !total.is_zero() => {
                Duration::from_secs_f64(elapsed.as_secs_f64() % total.as_secs_f64())
            }
            _ => elapsed,
        }
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
        // A mute toggle is a user gesture; autoplay is allowed afterwards
        self.autoplay_allowed.store(true, Ordering::Relaxed);
    }

    fn muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    fn set_duration(&self, duration: Option<Duration>) {
        *self.duration.lock().unwrap() = duration;
    }

    fn detach(&self) {
        let mut clock = self.clock.lock().unwrap();
        clock.playing = false;
        clock.base = Duration::ZERO;
        clock.started_at = None;
        *self.native_src.lock().unwrap() = None;
        *self.duration.lock().unwrap() = None;
    }
}

/// Off-screen sink used for preloading.
///
/// Never renders and never plays; its playhead is pinned at 0 so the
/// engine fills its forward buffer to the target and then idles.
#[derive(Default)]
pub struct DetachedSurface;

impl DetachedSurface {
    pub fn new() -> Self {
        Self
    }
}

impl MediaSurface for DetachedSurface {
    fn supports_native(&self, _src: &str) -> bool {
        false
    }

    fn set_native_source(&self, _src: &str) {}

    fn play(&self) -> std::result::Result<(), PlayRejected> {
        Err(PlayRejected)
    }

    fn pause(&self) {}

    fn rewind(&self) {}

    fn position(&self) -> Duration {
        Duration::ZERO
    }

    fn set_muted(&self, _muted: bool) {}

    fn muted(&self) -> bool {
        true
    }

    fn detach(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_pause_position() {
        let surface = FeedSurface::new(true);
        assert_eq!(surface.position(), Duration::ZERO);

        surface.play().unwrap();
        assert!(surface.is_playing());
        std::thread::sleep(Duration::from_millis(20));
        surface.pause();

        let paused_at = surface.position();
        assert!(paused_at >= Duration::from_millis(10));

        // Position holds while paused
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(surface.position(), paused_at);
    }

    #[test]
    fn test_rewind_resets_position() {
        let surface = FeedSurface::new(true);
        surface.play().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        surface.pause();
        assert!(surface.position() > Duration::ZERO);

        surface.rewind();
        assert_eq!(surface.position(), Duration::ZERO);
    }

    #[test]
    fn test_autoplay_rejection() {
        let surface = FeedSurface::new(true);
        surface.set_autoplay_allowed(false);
        assert_eq!(surface.play(), Err(PlayRejected));
        assert!(!surface.is_playing());

        // Mute toggle counts as a gesture
        surface.set_muted(false);
        assert!(surface.play().is_ok());
    }

    #[test]
    fn test_detached_surface_rejects_playback() {
        let surface = DetachedSurface::new();
        assert_eq!(surface.play(), Err(PlayRejected));
        assert_eq!(surface.position(), Duration::ZERO);
        assert!(surface.muted());
    }

    #[test]
    fn test_position_wraps_at_duration() {
        let surface = FeedSurface::new(true);
        surface.set_duration(Some(Duration::from_millis(30)));
        surface.play().unwrap();
        std::thread::sleep(Duration::from_millis(40));
        // Looped at least once; position stays inside the media duration
        assert!(surface.position() < Duration::from_millis(30));
    }
}
