//! HLS adaptive engine
//!
//! Loads a master playlist, picks a level per segment (pinned or ABR) and
//! appends segments to the render sink until `max_buffer_length` seconds are
//! buffered ahead of the play head. Loading runs on a spawned tokio task that
//! is aborted and respawned on restart, level pinning and destroy.

use super::{AdaptiveEngine, EngineEvent, EngineEventSender, EngineFactory};
use crate::abr::AbrController;
use crate::config::PlayerConfig;
use crate::error::{StreamError, StreamErrorKind};
use crate::manifest::{HttpManifestLoader, ManifestLoader, MediaPlaylist, Segment};
use crate::sink::RenderSink;
use crate::{Error, Result, Variant};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Poll interval while the buffer is full or the stream has ended
const IDLE_INTERVAL: Duration = Duration::from_millis(250);

/// Factory producing [`HlsEngine`]s that share one loader
pub struct HlsEngineFactory {
    loader: Arc<dyn ManifestLoader>,
    config: PlayerConfig,
}

impl HlsEngineFactory {
    /// Factory backed by an HTTP loader built from `config`
    pub fn new(config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        let loader = HttpManifestLoader::new(Duration::from_millis(config.request_timeout_ms))?;
        Ok(Self {
            loader: Arc::new(loader),
            config,
        })
    }

    pub fn with_loader(loader: Arc<dyn ManifestLoader>, config: PlayerConfig) -> Self {
        Self { loader, config }
    }
}

impl EngineFactory for HlsEngineFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, sink: Arc<dyn RenderSink>, events: EngineEventSender) -> Box<dyn AdaptiveEngine> {
        Box::new(HlsEngine::new(sink, events, self.loader.clone(), self.config.clone()))
    }
}

/// State shared between the engine handle and its loader task
struct EngineState {
    url: Option<Url>,
    levels: Vec<Variant>,
    /// Level of the last appended segment
    current_level: Option<usize>,
    /// Pinned level; `None` means ABR decides
    manual_level: Option<usize>,
    playlists: HashMap<usize, MediaPlaylist>,
    abr: AbrController,
}

/// Adaptive HLS engine bound to one render sink
pub struct HlsEngine {
    sink: Arc<dyn RenderSink>,
    events: EngineEventSender,
    loader: Arc<dyn ManifestLoader>,
    config: PlayerConfig,
    state: Arc<Mutex<EngineState>>,
    task: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HlsEngine {
    pub fn new(
        sink: Arc<dyn RenderSink>,
        events: EngineEventSender,
        loader: Arc<dyn ManifestLoader>,
        config: PlayerConfig,
    ) -> Self {
        let state = EngineState {
            url: None,
            levels: Vec::new(),
            current_level: None,
            manual_level: None,
            playlists: HashMap::new(),
            abr: AbrController::new(&config),
        };

        Self {
            sink,
            events,
            loader,
            config,
            state: Arc::new(Mutex::new(state)),
            task: None,
            destroyed: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.state)
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn spawn_loader(&mut self, start_position: f64) {
        self.stop_task();
        if self.destroyed {
            return;
        }

        let Some(url) = self.state().url.clone() else {
            warn!("start_load called before load_source");
            return;
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                let _ = self.events.send(EngineEvent::Error(StreamError::fatal(
                    StreamErrorKind::Other,
                    "no async runtime available for segment loading",
                )));
                return;
            }
        };

        let loader = Loader {
            sink: self.sink.clone(),
            events: self.events.clone(),
            loader: self.loader.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            url,
        };
        self.task = Some(handle.spawn(loader.run(start_position)));
    }
}

impl AdaptiveEngine for HlsEngine {
    fn load_source(&mut self, url: &Url, start_position: f64) {
        {
            let mut state = self.state();
            info!(url = %url, start = start_position, abr = state.abr.algorithm_name(), "Loading HLS source");
            state.url = Some(url.clone());
            state.levels.clear();
            state.playlists.clear();
            state.current_level = None;
            state.manual_level = self.config.start_level;
        }
        self.spawn_loader(start_position);
    }

    fn start_load(&mut self, position: f64) {
        debug!(position, "Restarting load");
        self.spawn_loader(position);
    }

    fn recover_media_error(&mut self) {
        info!("Recovering from media error");
        self.sink.reset_decoder();
        let position = self.sink.current_time();
        self.spawn_loader(position);
    }

    fn levels(&self) -> Vec<Variant> {
        self.state().levels.clone()
    }

    fn current_level(&self) -> Option<usize> {
        self.state().current_level
    }

    fn set_current_level(&mut self, level: Option<usize>) {
        let changed = {
            let mut state = self.state();
            let changed = state.manual_level != level;
            state.manual_level = level;
            changed
        };

        // Pinning switches immediately: buffered media of the old level is dropped
        if changed && level.is_some() && self.task.is_some() {
            let position = self.sink.current_time();
            self.sink.reset_decoder();
            self.spawn_loader(position);
        }
    }

    fn auto_level_enabled(&self) -> bool {
        self.state().manual_level.is_none()
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.stop_task();

        let mut state = self.state();
        state.playlists.clear();
        debug!(url = ?state.url, "HLS engine destroyed");
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pick the segment to fetch next on a playlist
///
/// `target` is the first unbuffered time. If it still falls in the segment
/// appended last, the following segment is chosen instead.
pub(crate) fn next_segment(
    playlist: &MediaPlaylist,
    target: f64,
    last_appended: Option<u64>,
) -> Option<&Segment> {
    let segment = playlist.segment_at(target)?;
    if Some(segment.number) == last_appended {
        playlist.segments.iter().find(|s| s.number == segment.number + 1)
    } else {
        Some(segment)
    }
}

/// Loader task context
struct Loader {
    sink: Arc<dyn RenderSink>,
    events: EngineEventSender,
    loader: Arc<dyn ManifestLoader>,
    config: PlayerConfig,
    state: Arc<Mutex<EngineState>>,
    url: Url,
}

impl Loader {
    fn emit(&self, event: EngineEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn emit_fatal(&self, error: &Error) {
        let kind = if error.is_recoverable() {
            StreamErrorKind::Network
        } else {
            StreamErrorKind::Other
        };
        warn!(code = error.error_code(), error = %error, "Loading stopped");
        self.emit(EngineEvent::Error(StreamError::fatal(kind, error.to_string())));
    }

    /// Run `op`, retrying recoverable failures with non-fatal reports
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    warn!(what, attempt, code = e.error_code(), error = %e, "Request failed, retrying");
                    self.emit(EngineEvent::Error(StreamError::non_fatal(
                        StreamErrorKind::Network,
                        e.to_string(),
                    )));
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn ensure_levels(&self) -> Option<Vec<Variant>> {
        let known = lock(&self.state).levels.clone();
        if !known.is_empty() {
            return Some(known);
        }

        let loader = self.loader.clone();
        let url = self.url.clone();
        let manifest = self
            .with_retry("manifest", || {
                let loader = loader.clone();
                let url = url.clone();
                async move { loader.load_manifest(&url).await }
            })
            .await;

        match manifest {
            Ok(manifest) if !manifest.variants.is_empty() => {
                info!(levels = manifest.variants.len(), master = manifest.is_master, "Manifest parsed");
                lock(&self.state).levels = manifest.variants.clone();
                self.emit(EngineEvent::ManifestParsed {
                    levels: manifest.variants.clone(),
                });
                Some(manifest.variants)
            }
            Ok(_) => {
                self.emit(EngineEvent::Error(StreamError::fatal(
                    StreamErrorKind::Other,
                    "manifest has no playable variants",
                )));
                None
            }
            Err(e) => {
                self.emit_fatal(&e);
                None
            }
        }
    }

    async fn playlist_for(&self, level: &Variant) -> Option<MediaPlaylist> {
        let cached = lock(&self.state).playlists.get(&level.index).cloned();
        if cached.is_some() {
            return cached;
        }

        let loader = self.loader.clone();
        let uri = level.uri.clone();
        let playlist = self
            .with_retry("media playlist", || {
                let loader = loader.clone();
                let uri = uri.clone();
                async move { loader.load_media_playlist(&uri).await }
            })
            .await;

        match playlist {
            Ok(playlist) => {
                lock(&self.state).playlists.insert(level.index, playlist.clone());
                Some(playlist)
            }
            Err(e) => {
                self.emit_fatal(&e);
                None
            }
        }
    }

    async fn run(self, start_position: f64) {
        let Some(levels) = self.ensure_levels().await else {
            return;
        };

        let mut resume_from = start_position.max(0.0);
        let mut last_appended: Option<u64> = None;
        let mut rendered_level = lock(&self.state).current_level;

        loop {
            let buffered = self.sink.buffered_ahead();
            if buffered >= self.config.max_buffer_length {
                tokio::time::sleep(IDLE_INTERVAL).await;
                continue;
            }

            let level = {
                let state = lock(&self.state);
                let pinned = state.manual_level.filter(|idx| *idx < levels.len());
                let chosen = pinned.or_else(|| state.abr.select_level(&levels, state.current_level, buffered));
                chosen
            };
            let Some(level) = level.and_then(|idx| levels.get(idx)) else {
                return;
            };

            let Some(playlist) = self.playlist_for(level).await else {
                return;
            };

            let target = (self.sink.current_time() + buffered).max(resume_from);
            let Some(segment) = next_segment(&playlist, target, last_appended).cloned() else {
                if !playlist.ended {
                    // Live playlist: refresh after a target duration
                    lock(&self.state).playlists.remove(&level.index);
                    tokio::time::sleep(playlist.target_duration.max(IDLE_INTERVAL)).await;
                } else {
                    tokio::time::sleep(IDLE_INTERVAL).await;
                }
                continue;
            };

            let loader = self.loader.clone();
            let uri = segment.uri.clone();
            let started = Instant::now();
            let data = self
                .with_retry("segment", || {
                    let loader = loader.clone();
                    let uri = uri.clone();
                    async move { loader.load_segment(&uri).await }
                })
                .await;

            let data = match data {
                Ok(data) => data,
                Err(e) => {
                    self.emit_fatal(&e);
                    return;
                }
            };

            let estimate = {
                let mut state = lock(&self.state);
                state.abr.record_measurement(data.len(), started.elapsed());
                state.abr.bandwidth_estimate()
            };

            if let Err(e) = self.sink.append_segment(level.index, data) {
                self.emit(EngineEvent::Error(StreamError::fatal(StreamErrorKind::Media, e.to_string())));
                return;
            }

            debug!(
                level = level.index,
                segment = segment.number,
                start = segment.start,
                estimate,
                "Segment appended"
            );
            last_appended = Some(segment.number);
            resume_from = 0.0;
            lock(&self.state).current_level = Some(level.index);

            if rendered_level != Some(level.index) {
                rendered_level = Some(level.index);
                if !self.emit(EngineEvent::LevelSwitched { level: level.index }) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist() -> MediaPlaylist {
        let base = Url::parse("https://cdn.example.com/720p/").unwrap();
        MediaPlaylist {
            segments: (0..4)
                .map(|i| Segment {
                    number: 10 + i,
                    uri: base.join(&format!("seg{}.ts", i)).unwrap(),
                    start: i as f64 * 4.0,
                    duration: 4.0,
                })
                .collect(),
            ended: true,
            target_duration: Duration::from_secs(4),
        }
    }

    #[test]
    fn test_next_segment_by_target() {
        let playlist = playlist();
        assert_eq!(next_segment(&playlist, 0.0, None).map(|s| s.number), Some(10));
        assert_eq!(next_segment(&playlist, 9.0, None).map(|s| s.number), Some(12));
    }

    #[test]
    fn test_next_segment_skips_last_appended() {
        let playlist = playlist();
        assert_eq!(next_segment(&playlist, 1.0, Some(10)).map(|s| s.number), Some(11));
        assert!(next_segment(&playlist, 13.0, Some(13)).is_none());
    }

    #[test]
    fn test_next_segment_past_end() {
        assert!(next_segment(&playlist(), 16.0, None).is_none());
    }
}
