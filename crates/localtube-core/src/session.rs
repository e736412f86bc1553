//! Media Session - one playback of one stream on one render sink
//!
//! Coordinates:
//! - Picking the playback path (adaptive engine, native, unavailable)
//! - Start position and autoplay once the stream is ready
//! - Fatal error policy (restart loading, recover decoder, tear down)
//! - Exclusive ownership of the render sink through its [`SinkSlot`]

use crate::{
    engine::{AdaptiveEngine, EngineEvent, EngineFactory},
    error::{StreamError, StreamErrorKind},
    manifest::{is_hls_url, HLS_MIME},
    sink::{play_tolerant, RenderSink, SinkSlot},
    Error, MediaEvent, PlaybackMode, PlayerState, Result, SessionId, Variant,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Shown when the platform can play neither adaptive nor native HLS
const UNSUPPORTED: &str = "HLS playback is not supported on this platform";

/// What a presenter needs to know after an engine or media event
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Stream is playable; `renditions` is empty for native playback
    Ready { renditions: Vec<Variant> },
    /// The engine switched the rendered level
    LevelSwitched { level: usize },
    /// A fatal error is being recovered in place
    Recovering { kind: StreamErrorKind },
    /// Playback is impossible; the session has been torn down
    Unavailable { reason: String },
}

/// A single playback of a stream URL on a render sink
pub struct MediaSession {
    id: SessionId,
    slot: Arc<SinkSlot>,
    url: Url,
    mode: PlaybackMode,
    state: PlayerState,
    engine: Option<Box<dyn AdaptiveEngine>>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    levels: Vec<Variant>,
    /// Applied once, when the stream first becomes ready
    pending_start: Option<f64>,
    pending_autoplay: bool,
    media_recovery_attempted: bool,
    /// Unavailability not yet reported through `next_event`
    pending_unavailable: Option<String>,
}

impl MediaSession {
    /// Open a session for `url` on the sink held by `slot`
    #[instrument(skip(slot, factory), fields(sink = slot.sink().name()))]
    pub fn open(
        slot: Arc<SinkSlot>,
        factory: &dyn EngineFactory,
        url: &Url,
        start_position: f64,
        autoplay: bool,
    ) -> Result<Self> {
        let id = SessionId::new();
        slot.attach(id)?;

        let start_position = if start_position.is_finite() { start_position.max(0.0) } else { 0.0 };
        let (tx, rx) = mpsc::unbounded_channel();

        let mut session = Self {
            id,
            slot,
            url: url.clone(),
            mode: PlaybackMode::Unavailable,
            state: PlayerState::Loading,
            engine: None,
            events: rx,
            levels: Vec::new(),
            pending_start: (start_position > 0.0).then_some(start_position),
            pending_autoplay: autoplay,
            media_recovery_attempted: false,
            pending_unavailable: None,
        };

        let sink = session.slot.sink().clone();
        if factory.is_supported() {
            let mut engine = factory.create(sink, tx);
            engine.load_source(url, start_position);
            session.engine = Some(engine);
            session.mode = PlaybackMode::Adaptive;
        } else if sink.can_play_type(HLS_MIME) || (!is_hls_url(url) && sink.can_play_type("video/mp4")) {
            sink.set_source(Some(url));
            session.mode = PlaybackMode::Native;
        } else {
            warn!(url = %url, "No adaptive or native HLS support");
            session.pending_unavailable = Some(UNSUPPORTED.to_string());
            session.teardown();
            session.set_state_logged(PlayerState::Failed);
        }

        info!(session_id = %id, mode = ?session.mode, start = start_position, autoplay, "Media session opened");
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn sink(&self) -> &Arc<dyn RenderSink> {
        self.slot.sink()
    }

    /// Levels from the parsed manifest, in manifest order
    pub fn levels(&self) -> &[Variant] {
        &self.levels
    }

    pub fn current_level(&self) -> Option<usize> {
        self.engine.as_ref().and_then(|e| e.current_level())
    }

    pub fn auto_level_enabled(&self) -> bool {
        self.engine.as_ref().map_or(true, |e| e.auto_level_enabled())
    }

    /// Pin the engine to a level, or `None` for automatic selection
    pub fn set_level(&mut self, level: Option<usize>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::SessionClosed);
        }
        if let Some(index) = level {
            if !self.levels.iter().any(|l| l.index == index) {
                return Err(Error::NoSuchRendition { index });
            }
        }
        let engine = self.engine.as_mut().ok_or(Error::QualityUnavailable)?;
        engine.set_current_level(level);
        debug!(level = ?level, "Level selection applied");
        Ok(())
    }

    /// Wait for the next engine event and apply it
    ///
    /// Returns `None` once no engine is feeding the session (native playback,
    /// closed, torn down).
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(reason) = self.pending_unavailable.take() {
            return Some(SessionEvent::Unavailable { reason });
        }

        loop {
            if self.state.is_terminal() {
                return None;
            }
            let event = self.events.recv().await?;
            if let Some(event) = self.process(event) {
                return Some(event);
            }
        }
    }

    /// Apply one engine event
    pub fn process(&mut self, event: EngineEvent) -> Option<SessionEvent> {
        if self.state.is_terminal() {
            return None;
        }

        match event {
            EngineEvent::ManifestParsed { levels } => {
                info!(levels = levels.len(), "Stream ready");
                self.levels = levels;
                self.become_ready();
                Some(SessionEvent::Ready {
                    renditions: self.levels.clone(),
                })
            }
            EngineEvent::LevelSwitched { level } => {
                if self.state == PlayerState::Recovering {
                    self.set_state_logged(PlayerState::Ready);
                }
                Some(SessionEvent::LevelSwitched { level })
            }
            EngineEvent::Error(error) if !error.fatal => {
                warn!(kind = %error.kind, details = %error.details, "Non-fatal stream error");
                None
            }
            EngineEvent::Error(error) => self.handle_fatal(error),
        }
    }

    /// Apply a render sink notification
    pub fn handle_media_event(&mut self, event: MediaEvent) -> Option<SessionEvent> {
        if self.state.is_terminal() {
            return None;
        }

        match event {
            MediaEvent::LoadedMetadata { duration } if self.mode == PlaybackMode::Native => {
                if self.state != PlayerState::Loading {
                    return None;
                }
                debug!(duration = ?duration, "Native metadata loaded");
                self.become_ready();
                Some(SessionEvent::Ready { renditions: Vec::new() })
            }
            MediaEvent::Play | MediaEvent::TimeUpdate(_) if self.state == PlayerState::Recovering => {
                self.set_state_logged(PlayerState::Ready);
                None
            }
            _ => None,
        }
    }

    /// Destroy the engine, release the sink; idempotent
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn close(&mut self) {
        if self.state == PlayerState::Closed {
            return;
        }
        self.teardown();
        self.set_state_logged(PlayerState::Closed);
        info!("Media session closed");
    }

    fn become_ready(&mut self) {
        self.set_state_logged(PlayerState::Ready);

        let sink = self.slot.sink().clone();
        if let Some(start) = self.pending_start.take() {
            debug!(start, "Seeking to start position");
            sink.set_current_time(start);
        }
        if std::mem::take(&mut self.pending_autoplay) {
            play_tolerant(sink.as_ref());
        }
    }

    fn handle_fatal(&mut self, error: StreamError) -> Option<SessionEvent> {
        warn!(kind = %error.kind, details = %error.details, "Fatal stream error");

        let has_engine = self.engine.is_some();
        match error.kind {
            StreamErrorKind::Network if has_engine => {
                let position = self.slot.sink().current_time();
                info!(position, "Restarting load after network error");
                if let Some(engine) = self.engine.as_mut() {
                    engine.start_load(position);
                }
                self.set_state_logged(PlayerState::Recovering);
                Some(SessionEvent::Recovering { kind: error.kind })
            }
            StreamErrorKind::Media if has_engine && !self.media_recovery_attempted => {
                info!("Attempting media error recovery");
                self.media_recovery_attempted = true;
                if let Some(engine) = self.engine.as_mut() {
                    engine.recover_media_error();
                }
                self.set_state_logged(PlayerState::Recovering);
                Some(SessionEvent::Recovering { kind: error.kind })
            }
            _ => {
                self.teardown();
                self.set_state_logged(PlayerState::Failed);
                Some(SessionEvent::Unavailable {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Release the engine and the sink without changing state
    fn teardown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }

        let sink = self.slot.sink();
        if self.slot.attached() == Some(self.id) {
            sink.pause();
            if self.mode == PlaybackMode::Native {
                sink.set_source(None);
            }
        }
        self.slot.detach(self.id);
        self.events.close();
    }

    fn set_state(&mut self, new_state: PlayerState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }
        debug!(from = %self.state, to = %new_state, "State transition");
        self.state = new_state;
        Ok(())
    }

    fn set_state_logged(&mut self, new_state: PlayerState) {
        if let Err(e) = self.set_state(new_state) {
            debug!(error = %e, "Ignoring state change");
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("levels", &self.levels.len())
            .finish()
    }
}
