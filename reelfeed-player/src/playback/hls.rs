//! HLS engine implementation
//!
//! Fetches a manifest over HTTP, resolves one variant, and keeps a bounded
//! forward buffer of segments against the surface playhead. Transport
//! failures are retried with exponential backoff inside the loader; once
//! the retry budget is exhausted a fault is reported and loading halts
//! until the owning session resumes or rebuilds.

use crate::config::EngineConfig;
use crate::playback::engine::{EngineFactory, StreamEngine};
use crate::playback::surface::MediaSurface;
use crate::playback::types::{BufferStats, EngineEvent, EngineFault, FaultKind};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// Builds `HlsEngine` instances over a shared HTTP client.
///
/// The client carries no global timeout; every request gets the
/// per-request timeout from `EngineConfig`.
#[derive(Clone)]
pub struct HlsEngineFactory {
    client: reqwest::Client,
}

impl HlsEngineFactory {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HlsEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for HlsEngineFactory {
    fn create(
        &self,
        src: &str,
        config: &EngineConfig,
        surface: Arc<dyn MediaSurface>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Box<dyn StreamEngine> {
        Box::new(HlsEngine::spawn(
            self.client.clone(),
            src.to_string(),
            config.clone(),
            surface,
            events,
        ))
    }
}

/// One buffered media segment
struct BufferedSegment {
    sequence: u64,
    duration: f64,
    data: Bytes,
}

/// Forward buffer with media-time bookkeeping.
///
/// `start_secs..end_secs` is the buffered media window; eviction advances
/// the start, loading advances the end.
#[derive(Default)]
struct SegmentBuffer {
    segments: VecDeque<BufferedSegment>,
    bytes: usize,
    start_secs: f64,
    end_secs: f64,
}

impl SegmentBuffer {
    fn push(&mut self, sequence: u64, duration: f64, data: Bytes) {
        self.bytes += data.len();
        self.end_secs += duration;
        self.segments.push_back(BufferedSegment {
            sequence,
            duration,
            data,
        });
    }

    /// Drop the most recent segment; returns its sequence
    fn pop_back(&mut self) -> Option<u64> {
        let seg = self.segments.pop_back()?;
        self.bytes -= seg.data.len();
        self.end_secs -= seg.duration;
        Some(seg.sequence)
    }

    /// Evict segments wholly behind `horizon_secs` of media time
    fn evict_before(&mut self, horizon_secs: f64) {
        while let Some(front) = self.segments.front() {
            if self.start_secs + front.duration > horizon_secs {
                break;
            }
            self.start_secs += front.duration;
            self.bytes -= front.data.len();
            self.segments.pop_front();
        }
    }

    fn forward_secs(&self, position_secs: f64) -> f64 {
        (self.end_secs - position_secs).max(0.0)
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.bytes = 0;
        self.start_secs = 0.0;
        self.end_secs = 0.0;
    }
}

/// State shared between the engine handle and its loader task
struct LoaderShared {
    loading: AtomicBool,
    destroyed: AtomicBool,
    recover_requested: AtomicBool,
    wake: Notify,
    buffer: Mutex<SegmentBuffer>,
    surface: Arc<dyn MediaSurface>,
}

/// HLS engine instance: a loader task plus the control handle.
pub struct HlsEngine {
    shared: Arc<LoaderShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HlsEngine {
    fn spawn(
        client: reqwest::Client,
        src: String,
        config: EngineConfig,
        surface: Arc<dyn MediaSurface>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let shared = Arc::new(LoaderShared {
            loading: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
            recover_requested: AtomicBool::new(false),
            wake: Notify::new(),
            buffer: Mutex::new(SegmentBuffer::default()),
            surface,
        });

        let loader = Loader {
            client,
            src,
            config,
            events,
            shared: Arc::clone(&shared),
        };

        let task = tokio::spawn(loader.run());

        Self {
            shared,
            task: Mutex::new(Some(task)),
        }
    }
}

impl StreamEngine for HlsEngine {
    fn start_load(&self) {
        self.shared.loading.store(true, Ordering::Relaxed);
        self.shared.wake.notify_one();
    }

    fn stop_load(&self) {
        self.shared.loading.store(false, Ordering::Relaxed);
    }

    fn recover_media(&self) {
        self.shared.recover_requested.store(true, Ordering::Relaxed);
        self.shared.loading.store(true, Ordering::Relaxed);
        self.shared.wake.notify_one();
    }

    fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::Relaxed) {
            return; // already destroyed
        }
        self.shared.loading.store(false, Ordering::Relaxed);
        self.shared.wake.notify_one();
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
        self.shared.buffer.lock().unwrap().clear();
    }

    fn buffer_stats(&self) -> BufferStats {
        let position = self.shared.surface.position().as_secs_f64();
        let buffer = self.shared.buffer.lock().unwrap();
        BufferStats {
            forward_secs: buffer.forward_secs(position),
            bytes: buffer.bytes,
        }
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Variant playlist resolved to absolute segment URLs
struct LoadedPlaylist {
    segments: Vec<ResolvedSegment>,
    media_duration: Option<Duration>,
}

struct ResolvedSegment {
    url: Url,
    duration: f64,
}

/// The loader task body
struct Loader {
    client: reqwest::Client,
    src: String,
    config: EngineConfig,
    events: mpsc::UnboundedSender<EngineEvent>,
    shared: Arc<LoaderShared>,
}

impl Loader {
    async fn run(self) {
        let mut playlist: Option<LoadedPlaylist> = None;
        let mut next_index: usize = 0;
        let mut end_notified = false;

        loop {
            if self.shared.destroyed.load(Ordering::Relaxed) {
                break;
            }
            if !self.shared.loading.load(Ordering::Relaxed) {
                self.shared.wake.notified().await;
                continue;
            }

            // Decoder recovery: drop the newest segment and refetch it
            if self.shared.recover_requested.swap(false, Ordering::Relaxed) {
                if let Some(sequence) = self.shared.buffer.lock().unwrap().pop_back() {
                    debug!(sequence, "refetching segment after decoder recovery");
                    next_index = sequence as usize;
                    end_notified = false;
                }
            }

            if playlist.is_none() {
                match self.load_playlist().await {
                    Ok(loaded) => {
                        debug!(
                            src = %self.src,
                            segments = loaded.segments.len(),
                            "manifest parsed"
                        );
                        self.emit(EngineEvent::ManifestParsed {
                            media_duration: loaded.media_duration,
                        });
                        playlist = Some(loaded);
                        next_index = 0;
                    }
                    Err(detail) => {
                        warn!(src = %self.src, %detail, "manifest load failed");
                        self.emit(EngineEvent::Fault(EngineFault {
                            kind: FaultKind::Network,
                            fatal: true,
                            detail,
                        }));
                        self.shared.loading.store(false, Ordering::Relaxed);
                    }
                    // Loading resumes when the session calls start_load
                }
                continue;
            }

            let Some(loaded) = playlist.as_ref() else {
                continue;
            };

            let position_secs = self.shared.surface.position().as_secs_f64();
            let back_horizon = position_secs - self.config.back_buffer.as_secs_f64();

            if next_index >= loaded.segments.len() {
                if !end_notified {
                    self.emit(EngineEvent::EndOfStream);
                    end_notified = true;
                }
                // Keep trimming behind the playhead as rows loop
                self.shared
                    .buffer
                    .lock()
                    .unwrap()
                    .evict_before(back_horizon);
                sleep(Duration::from_millis(250)).await;
                continue;
            }

            let over_budget = {
                let buffer = self.shared.buffer.lock().unwrap();
                let forward = buffer.forward_secs(position_secs);
                forward >= self.config.target_forward_buffer.as_secs_f64()
                    || forward >= self.config.max_forward_buffer.as_secs_f64()
                    || buffer.bytes >= self.config.max_buffer_bytes
            };

            if over_budget {
                self.shared
                    .buffer
                    .lock()
                    .unwrap()
                    .evict_before(back_horizon);
                sleep(Duration::from_millis(200)).await;
                continue;
            }

            let segment = &loaded.segments[next_index];
            match self.fetch_with_retries(segment.url.clone()).await {
                Ok(data) if data.is_empty() => {
                    // An unplayable segment is the decode-fault analog
                    warn!(sequence = next_index, "empty segment body");
                    self.emit(EngineEvent::Fault(EngineFault {
                        kind: FaultKind::Media,
                        fatal: true,
                        detail: format!("segment {} has no payload", next_index),
                    }));
                    self.shared.loading.store(false, Ordering::Relaxed);
                }
                Ok(data) => {
                    let bytes = data.len();
                    self.shared.buffer.lock().unwrap().push(
                        next_index as u64,
                        segment.duration,
                        data,
                    );
                    self.emit(EngineEvent::FragmentBuffered {
                        sequence: next_index as u64,
                        duration: Duration::from_secs_f64(segment.duration),
                        bytes,
                    });
                    next_index += 1;
                }
                Err(detail) => {
                    warn!(sequence = next_index, %detail, "segment fetch failed");
                    self.emit(EngineEvent::Fault(EngineFault {
                        kind: FaultKind::Network,
                        fatal: true,
                        detail,
                    }));
                    self.shared.loading.store(false, Ordering::Relaxed);
                }
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        // Receiver dropped means the session moved on; nothing to report
        let _ = self.events.send(event);
    }

    /// Fetch the manifest, resolving a master playlist to its
    /// highest-bandwidth variant.
    async fn load_playlist(&self) -> std::result::Result<LoadedPlaylist, String> {
        let manifest_url =
            Url::parse(&self.src).map_err(|e| format!("invalid manifest URL: {}", e))?;

        let bytes = self.fetch_with_retries(manifest_url.clone()).await?;

        let media = match m3u8_rs::parse_playlist_res(&bytes) {
            Ok(m3u8_rs::Playlist::MediaPlaylist(media)) => media,
            Ok(m3u8_rs::Playlist::MasterPlaylist(master)) => {
                let variant = master
                    .variants
                    .iter()
                    .max_by_key(|v| v.bandwidth)
                    .ok_or_else(|| "master playlist has no variants".to_string())?;
                let variant_url = manifest_url
                    .join(&variant.uri)
                    .map_err(|e| format!("invalid variant URI: {}", e))?;

                let variant_bytes = self.fetch_with_retries(variant_url).await?;
                match m3u8_rs::parse_playlist_res(&variant_bytes) {
                    Ok(m3u8_rs::Playlist::MediaPlaylist(media)) => media,
                    Ok(m3u8_rs::Playlist::MasterPlaylist(_)) => {
                        return Err("variant resolved to another master playlist".to_string());
                    }
                    Err(e) => return Err(format!("failed to parse variant playlist: {}", e)),
                }
            }
            Err(e) => return Err(format!("failed to parse manifest: {}", e)),
        };

        let mut segments = Vec::with_capacity(media.segments.len());
        let mut total_secs = 0.0f64;
        for segment in &media.segments {
            let url = manifest_url
                .join(&segment.uri)
                .map_err(|e| format!("invalid segment URI: {}", e))?;
            total_secs += segment.duration as f64;
            segments.push(ResolvedSegment {
                url,
                duration: segment.duration as f64,
            });
        }

        let media_duration = if media.end_list {
            Some(Duration::from_secs_f64(total_secs))
        } else {
            None
        };

        Ok(LoadedPlaylist {
            segments,
            media_duration,
        })
    }

    /// GET with per-request timeout and capped exponential backoff.
    async fn fetch_with_retries(&self, url: Url) -> std::result::Result<Bytes, String> {
        let mut delay = self.config.retry_base_delay;
        let mut attempt: u32 = 0;

        loop {
            if self.shared.destroyed.load(Ordering::Relaxed)
                || !self.shared.loading.load(Ordering::Relaxed)
            {
                return Err("load cancelled".to_string());
            }

            let failure = match self
                .client
                .get(url.clone())
                .timeout(self.config.request_timeout)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    match response.bytes().await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => format!("body read failed: {}", e),
                    }
                }
                Ok(response) => format!("HTTP {} for {}", response.status(), url),
                Err(e) => format!("request failed: {}", e),
            };

            attempt += 1;
            if attempt > self.config.max_retries {
                return Err(failure);
            }

            debug!(%url, attempt, %failure, "retrying fetch");
            sleep(delay).await;
            delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_buffer_accounting() {
        let mut buffer = SegmentBuffer::default();
        buffer.push(0, 4.0, Bytes::from(vec![0u8; 100]));
        buffer.push(1, 4.0, Bytes::from(vec![0u8; 200]));

        assert_eq!(buffer.bytes, 300);
        assert_eq!(buffer.forward_secs(0.0), 8.0);
        assert_eq!(buffer.forward_secs(3.0), 5.0);

        // Fully consumed and beyond: forward buffer is empty, not negative
        assert_eq!(buffer.forward_secs(10.0), 0.0);
    }

    #[test]
    fn test_segment_buffer_pop_back() {
        let mut buffer = SegmentBuffer::default();
        buffer.push(0, 4.0, Bytes::from(vec![0u8; 100]));
        buffer.push(1, 2.0, Bytes::from(vec![0u8; 50]));

        assert_eq!(buffer.pop_back(), Some(1));
        assert_eq!(buffer.bytes, 100);
        assert_eq!(buffer.forward_secs(0.0), 4.0);

        assert_eq!(buffer.pop_back(), Some(0));
        assert_eq!(buffer.pop_back(), None);
    }

    #[test]
    fn test_segment_buffer_eviction() {
        let mut buffer = SegmentBuffer::default();
        buffer.push(0, 4.0, Bytes::from(vec![0u8; 100]));
        buffer.push(1, 4.0, Bytes::from(vec![0u8; 100]));
        buffer.push(2, 4.0, Bytes::from(vec![0u8; 100]));

        // Playhead at 9s with no back buffer: first two segments go
        buffer.evict_before(9.0);
        assert_eq!(buffer.segments.len(), 1);
        assert_eq!(buffer.bytes, 100);
        assert_eq!(buffer.start_secs, 8.0);

        // End of buffered window is unaffected by eviction
        assert_eq!(buffer.forward_secs(9.0), 3.0);
    }

    #[test]
    fn test_eviction_keeps_partially_played_segment() {
        let mut buffer = SegmentBuffer::default();
        buffer.push(0, 4.0, Bytes::from(vec![0u8; 100]));
        buffer.push(1, 4.0, Bytes::from(vec![0u8; 100]));

        // Horizon falls inside segment 1: only segment 0 is evicted
        buffer.evict_before(6.0);
        assert_eq!(buffer.segments.len(), 1);
        assert_eq!(buffer.segments.front().unwrap().sequence, 1);
    }
}
