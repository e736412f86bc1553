//! Full-page player
//!
//! Opens the stream at the route's start position, mirrors every tick and
//! play/pause into the store, counts one view per mount and hands playback
//! to the mini-player when the page goes away.

use super::UNAVAILABLE_MESSAGE;
use crate::api::{download_qualities, VideoApi, VideoMetadata};
use crate::config::FullPlayerConfig;
use crate::engine::EngineFactory;
use crate::manifest::quality_playlist_url;
use crate::quality::QualityController;
use crate::route::PlayerRoute;
use crate::session::{MediaSession, SessionEvent};
use crate::sink::{play_tolerant, SinkSlot};
use crate::store::{ActivateRequest, SessionStore};
use crate::tracker::PositionTracker;
use crate::{
    Error, MediaEvent, PlayerState, QualityMode, RenditionDescriptor, Result, StreamId, Surface,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Presenter lifecycle as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullPlayerStatus {
    /// Nothing mounted
    Idle,
    /// Session opened, stream not ready yet
    Loading,
    Ready,
    /// Playback continues in the mini-player
    HandedOff,
    /// Calm terminal message instead of the player
    Unavailable { message: String },
}

/// Drawing model of the full player
#[derive(Debug, Clone, PartialEq)]
pub struct FullPlayerView {
    pub status: FullPlayerStatus,
    pub title: String,
    pub position_seconds: f64,
    pub is_playing: bool,
    pub quality_label: String,
    /// Empty when the quality selector must not render
    pub renditions: Vec<RenditionDescriptor>,
    pub download_qualities: Vec<String>,
    /// `0.0..=1.0`
    pub volume: f64,
    pub muted: bool,
}

pub struct FullPlayer {
    store: SessionStore,
    slot: Arc<SinkSlot>,
    factory: Arc<dyn EngineFactory>,
    api: Arc<dyn VideoApi>,
    config: FullPlayerConfig,
    video: Option<VideoMetadata>,
    session: Option<MediaSession>,
    quality: QualityController,
    tracker: PositionTracker,
    status: FullPlayerStatus,
    volume: f64,
    muted: bool,
}

impl FullPlayer {
    pub fn new(
        store: SessionStore,
        slot: Arc<SinkSlot>,
        factory: Arc<dyn EngineFactory>,
        api: Arc<dyn VideoApi>,
        config: FullPlayerConfig,
    ) -> Self {
        let tracker = PositionTracker::from_config(&config);
        Self {
            store,
            slot,
            factory,
            api,
            config,
            video: None,
            session: None,
            quality: QualityController::new(),
            tracker,
            status: FullPlayerStatus::Idle,
            volume: 1.0,
            muted: false,
        }
    }

    /// Mount the player for `video`, starting where `route` says
    #[instrument(skip(self, video), fields(video_id = %video.id))]
    pub fn mount(&mut self, video: VideoMetadata, route: &PlayerRoute) -> Result<()> {
        self.close_session();
        self.quality.reset();
        self.tracker = PositionTracker::from_config(&self.config);

        let url = match video.playable_url(self.api.media_base()) {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                warn!(error = %e, "Video has an unusable stream URL");
                self.status = FullPlayerStatus::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                };
                self.video = Some(video);
                return Ok(());
            }
            None => {
                info!(status = ?video.status, "Video is not playable yet");
                self.status = FullPlayerStatus::Unavailable {
                    message: video.unavailable_message().to_string(),
                };
                self.video = Some(video);
                return Ok(());
            }
        };

        let start = route.start_position();
        let autoplay = route.start_seconds.is_some() || self.config.autoplay;

        let session = MediaSession::open(self.slot.clone(), self.factory.as_ref(), &url, start, autoplay)?;
        session.sink().set_volume(self.volume);
        session.sink().set_muted(self.muted);
        self.store.activate(ActivateRequest {
            stream_id: video.id.clone(),
            display_title: video.title.clone(),
            stream_url: url,
            position_seconds: start,
            is_playing: autoplay,
            surface: Surface::Full,
        });

        info!(start, autoplay, "Full player mounted");
        self.session = Some(session);
        self.video = Some(video);
        self.status = FullPlayerStatus::Loading;
        Ok(())
    }

    /// Wait for the next event of the mounted session and apply it
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.session.as_mut()?.next_event().await?;
        self.handle_session_event(event.clone());
        Some(event)
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready { renditions } => {
                self.quality.on_manifest_parsed(&renditions);
                self.status = FullPlayerStatus::Ready;
            }
            SessionEvent::LevelSwitched { level } => self.quality.on_level_switched(level),
            SessionEvent::Recovering { kind } => debug!(kind = %kind, "Stream recovering"),
            SessionEvent::Unavailable { reason } => {
                warn!(reason = %reason, "Stream unavailable");
                self.quality.reset();
                self.status = FullPlayerStatus::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                };
                if self.owns_store_session(Surface::Full) {
                    self.store.deactivate();
                }
            }
        }
    }

    /// Mirror a render sink notification and count the view once
    ///
    /// The view is reported on a spawned task so that a slow backend never
    /// holds up position mirroring.
    pub fn on_media_event(&mut self, event: MediaEvent) {
        if let Some(session_event) = self.session.as_mut().and_then(|s| s.handle_media_event(event)) {
            self.handle_session_event(session_event);
        }

        match event {
            MediaEvent::TimeUpdate(seconds) => {
                self.store.update_position(seconds);
                if self.tracker.on_time_update(seconds) {
                    self.record_view();
                }
            }
            MediaEvent::Play => {
                self.tracker.set_playing(true);
                self.store.set_playing(true);
            }
            MediaEvent::Pause | MediaEvent::Ended => {
                self.tracker.set_playing(false);
                self.store.set_playing(false);
            }
            MediaEvent::LoadedMetadata { .. } => {}
        }
    }

    fn record_view(&self) {
        let Some(video_id) = self.stream_id().cloned() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(video_id = %video_id, "No async runtime; view not recorded");
            return;
        };

        let api = self.api.clone();
        handle.spawn(async move {
            match api.increment_view(&video_id).await {
                Ok(()) => info!(video_id = %video_id, "View recorded"),
                Err(e) => warn!(video_id = %video_id, error = %e, "Failed to record view"),
            }
        });
    }

    pub fn toggle_play(&mut self) {
        let Some(session) = self.ready_session() else {
            return;
        };
        let sink = session.sink();
        if sink.is_paused() {
            play_tolerant(sink.as_ref());
            self.store.set_playing(true);
        } else {
            sink.pause();
            self.store.set_playing(false);
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let seconds = seconds.max(0.0);
        if let Some(session) = self.ready_session() {
            session.sink().set_current_time(seconds);
            self.store.update_position(seconds);
        }
    }

    pub fn select_quality(&mut self, mode: QualityMode) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::SessionClosed)?;
        self.quality.select(session, mode)
    }

    /// Set the output volume; zero reads as muted
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = self.volume == 0.0;
        if let Some(session) = &self.session {
            session.sink().set_volume(self.volume);
            session.sink().set_muted(self.muted);
        }
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        if let Some(session) = &self.session {
            session.sink().set_muted(self.muted);
        }
    }

    /// Playlist URL offered for downloading one quality of the mounted video
    pub fn download_url(&self, quality: &str) -> Option<Result<Url>> {
        let video = self.video.as_ref()?;
        if !download_qualities(video).iter().any(|q| q == quality) {
            return None;
        }
        let url = video.playable_url(self.api.media_base())?;
        Some(url.and_then(|url| quality_playlist_url(&url, quality)))
    }

    pub fn quality_label(&self) -> String {
        self.quality.current_label()
    }

    pub fn renditions(&self) -> &[RenditionDescriptor] {
        self.quality.list_renditions()
    }

    pub fn status(&self) -> &FullPlayerStatus {
        &self.status
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Hand playback to the mini-player and release the sink
    pub fn send_to_mini_player(&mut self) -> bool {
        let Some(stream_id) = self.stream_id().cloned() else {
            return false;
        };

        if let Some(session) = self.ready_session() {
            let sink = session.sink();
            self.store.update_position(sink.current_time());
            self.store.set_playing(!sink.is_paused());
        }

        let moved = self.store.hand_off(&stream_id, Surface::Mini);
        self.close_session();
        if moved {
            self.status = FullPlayerStatus::HandedOff;
        }
        moved
    }

    /// Leave the page; playback continues in the mini-player if configured
    pub fn unmount(&mut self) {
        let handed_off = self.config.continue_in_mini_player
            && self.session.as_ref().is_some_and(|s| !s.state().is_terminal())
            && self.send_to_mini_player();

        if !handed_off && self.owns_store_session(Surface::Full) {
            self.store.deactivate();
        }

        self.close_session();
        self.quality.reset();
        self.video = None;
        self.status = FullPlayerStatus::Idle;
        debug!(handed_off, "Full player unmounted");
    }

    pub fn view(&self) -> FullPlayerView {
        let snapshot = self.store.snapshot();
        let ours = self.owns_store_session(Surface::Full);

        FullPlayerView {
            status: self.status.clone(),
            title: self.video.as_ref().map(|v| v.title.clone()).unwrap_or_default(),
            position_seconds: if ours { snapshot.position_seconds } else { self.tracker.position() },
            is_playing: ours && snapshot.is_playing,
            quality_label: self.quality.current_label(),
            renditions: self.quality.list_renditions().to_vec(),
            download_qualities: self.video.as_ref().map(download_qualities).unwrap_or_default(),
            volume: self.volume,
            muted: self.muted,
        }
    }

    fn stream_id(&self) -> Option<&StreamId> {
        self.video.as_ref().map(|v| &v.id)
    }

    fn ready_session(&self) -> Option<&MediaSession> {
        self.session.as_ref().filter(|s| s.state() == PlayerState::Ready)
    }

    /// Whether the store still holds this player's stream on `surface`
    fn owns_store_session(&self, surface: Surface) -> bool {
        let snapshot = self.store.snapshot();
        snapshot.active && snapshot.surface == surface && snapshot.stream_id.as_ref() == self.stream_id()
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}
