//! Floating mini-player

use super::drag::{DragPosition, Point, PointerListeners, PointerSubscription, PointerTarget, Viewport};
use super::UNAVAILABLE_MESSAGE;
use crate::config::MiniPlayerConfig;
use crate::engine::EngineFactory;
use crate::route::{Navigator, PlayerRoute};
use crate::session::{MediaSession, SessionEvent};
use crate::sink::{play_tolerant, SinkSlot};
use crate::store::SessionStore;
use crate::{MediaEvent, PlaybackSession, PlayerState, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything needed to draw the mini-player
#[derive(Debug, Clone, PartialEq)]
pub struct MiniPlayerView {
    pub title: String,
    pub position_seconds: f64,
    pub is_playing: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub dragging: bool,
    /// Set when the stream cannot be played
    pub message: Option<String>,
}

/// Active drag: grab offset plus the pointer listeners it holds
struct Drag {
    offset: Point,
    _subscription: PointerSubscription,
}

/// Mini-player presenter bound to its own render sink
pub struct MiniPlayer {
    store: SessionStore,
    slot: Arc<SinkSlot>,
    factory: Arc<dyn EngineFactory>,
    navigator: Arc<dyn Navigator>,
    config: MiniPlayerConfig,
    viewport: Viewport,
    position: DragPosition,
    listeners: PointerListeners,
    drag: Option<Drag>,
    session: Option<MediaSession>,
    message: Option<String>,
}

impl MiniPlayer {
    pub fn new(
        store: SessionStore,
        slot: Arc<SinkSlot>,
        factory: Arc<dyn EngineFactory>,
        navigator: Arc<dyn Navigator>,
        config: MiniPlayerConfig,
        viewport: Viewport,
    ) -> Self {
        let position = DragPosition::new(
            viewport.width - config.width - config.margin_right,
            viewport.height - config.height - config.margin_bottom,
        )
        .clamp(config.width, config.height, viewport);

        Self {
            store,
            slot,
            factory,
            navigator,
            config,
            viewport,
            position,
            listeners: PointerListeners::new(),
            drag: None,
            session: None,
            message: None,
        }
    }

    /// Reconcile with the store: mount, remount, tear down, play or pause
    pub fn sync(&mut self) -> Result<()> {
        let snapshot = self.store.snapshot();
        let url = match snapshot.stream_url.as_ref() {
            Some(url) if snapshot.is_mini() => url,
            _ => {
                if self.session.is_some() {
                    debug!("Store no longer targets the mini-player");
                }
                self.teardown();
                return Ok(());
            }
        };

        if self.session.as_ref().map(|s| s.url()) != Some(url) {
            self.close_session();
            self.message = None;

            info!(
                stream_id = ?snapshot.stream_id,
                position = snapshot.position_seconds,
                playing = snapshot.is_playing,
                "Mounting mini-player session"
            );
            let session = MediaSession::open(
                self.slot.clone(),
                self.factory.as_ref(),
                url,
                snapshot.position_seconds,
                snapshot.is_playing,
            )?;
            self.session = Some(session);
        }

        self.reconcile_play_state(&snapshot);
        Ok(())
    }

    /// Wait for the next event of the mounted session
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.session.as_mut()?.next_event().await?;
        self.apply_session_event(&event);
        Some(event)
    }

    fn apply_session_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Ready { .. } => {
                let snapshot = self.store.snapshot();
                self.reconcile_play_state(&snapshot);
            }
            SessionEvent::Unavailable { reason } => {
                warn!(reason = %reason, "Mini-player stream unavailable");
                self.message = Some(UNAVAILABLE_MESSAGE.to_string());
            }
            _ => {}
        }
    }

    /// Mirror render sink notifications into the store
    pub fn on_media_event(&mut self, event: MediaEvent) {
        if let Some(session_event) = self.session.as_mut().and_then(|s| s.handle_media_event(event)) {
            self.apply_session_event(&session_event);
        }

        match event {
            MediaEvent::TimeUpdate(seconds) => self.store.update_position(seconds),
            MediaEvent::Play => self.store.set_playing(true),
            MediaEvent::Pause | MediaEvent::Ended => self.store.set_playing(false),
            MediaEvent::LoadedMetadata { .. } => {}
        }
    }

    /// Start a drag unless the pointer landed on the controls
    pub fn pointer_down(&mut self, point: Point, target: PointerTarget) -> bool {
        if target == PointerTarget::Controls || !self.is_shown() {
            return false;
        }

        self.drag = Some(Drag {
            offset: Point::new(point.x - self.position.x, point.y - self.position.y),
            _subscription: self.listeners.subscribe(),
        });
        true
    }

    pub fn pointer_move(&mut self, point: Point) {
        let Some(drag) = &self.drag else {
            return;
        };
        self.position = DragPosition::new(point.x - drag.offset.x, point.y - drag.offset.y).clamp(
            self.config.width,
            self.config.height,
            self.viewport,
        );
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.position = self.position.clamp(self.config.width, self.config.height, viewport);
    }

    /// Flip the desired play state and apply it to the sink
    pub fn toggle_play(&mut self) {
        self.store.toggle_play();
        let snapshot = self.store.snapshot();
        self.reconcile_play_state(&snapshot);
    }

    pub fn close(&mut self) {
        info!("Mini-player closed");
        self.store.deactivate();
        self.teardown();
    }

    /// Leave the mini-player for the full player at the current position
    pub fn expand(&mut self) -> Option<PlayerRoute> {
        let snapshot = self.store.snapshot();
        let stream_id = snapshot.stream_id.clone().filter(|_| snapshot.is_mini())?;

        let position = self
            .session
            .as_ref()
            .filter(|s| s.state() == PlayerState::Ready)
            .map(|s| s.sink().current_time())
            .unwrap_or(snapshot.position_seconds);

        self.store.deactivate();
        self.teardown();

        let route = PlayerRoute::from_position(stream_id, position);
        info!(route = %route, "Expanding to full player");
        self.navigator.navigate(&route);
        Some(route)
    }

    /// Drawing model; `None` when nothing may be rendered
    pub fn view(&self) -> Option<MiniPlayerView> {
        let snapshot = self.store.snapshot();
        if !snapshot.is_mini() {
            return None;
        }

        Some(MiniPlayerView {
            title: snapshot.display_title,
            position_seconds: snapshot.position_seconds,
            is_playing: snapshot.is_playing,
            x: self.position.x,
            y: self.position.y,
            width: self.config.width,
            height: self.config.height,
            dragging: self.drag.is_some(),
            message: self.message.clone(),
        })
    }

    pub fn position(&self) -> DragPosition {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn listeners(&self) -> &PointerListeners {
        &self.listeners
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    /// Release the session and any drag; the store is left untouched
    pub fn unmount(&mut self) {
        self.teardown();
    }

    fn is_shown(&self) -> bool {
        self.store.snapshot().is_mini()
    }

    fn reconcile_play_state(&self, snapshot: &PlaybackSession) {
        let Some(session) = self.session.as_ref().filter(|s| s.state() == PlayerState::Ready) else {
            return;
        };

        let sink = session.sink();
        match (snapshot.is_playing, sink.is_paused()) {
            (true, true) => play_tolerant(sink.as_ref()),
            (false, false) => sink.pause(),
            _ => {}
        }
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    fn teardown(&mut self) {
        self.drag = None;
        self.message = None;
        self.close_session();
    }
}
