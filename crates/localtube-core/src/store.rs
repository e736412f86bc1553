//! Shared playback session record
//!
//! One [`PlaybackSession`] per client, held in a `tokio::sync::watch` channel.
//! Writers replace or modify it atomically; readers take snapshots or
//! subscribe to changes. Clones share the same record.

use crate::{PlaybackSession, StreamId, Surface};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

/// Input to [`SessionStore::activate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateRequest {
    pub stream_id: StreamId,
    pub display_title: String,
    pub stream_url: Url,
    pub position_seconds: f64,
    pub is_playing: bool,
    pub surface: Surface,
}

/// Store holding the single logical playback session
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<PlaybackSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlaybackSession::inactive());
        Self { tx: Arc::new(tx) }
    }

    /// Replace the record wholesale; the last caller wins
    pub fn activate(&self, request: ActivateRequest) {
        info!(
            stream_id = %request.stream_id,
            position = request.position_seconds,
            surface = ?request.surface,
            "Playback session activated"
        );

        self.tx.send_replace(PlaybackSession {
            active: true,
            stream_id: Some(request.stream_id),
            display_title: request.display_title,
            stream_url: Some(request.stream_url),
            position_seconds: sanitize_position(request.position_seconds),
            is_playing: request.is_playing,
            surface: request.surface,
        });
    }

    pub fn deactivate(&self) {
        let changed = self.tx.send_if_modified(|session| {
            if *session == PlaybackSession::inactive() {
                return false;
            }
            *session = PlaybackSession::inactive();
            true
        });
        if changed {
            info!("Playback session deactivated");
        }
    }

    /// Record the play head; ignored while inactive
    pub fn update_position(&self, seconds: f64) {
        let seconds = sanitize_position(seconds);
        self.tx.send_if_modified(|session| {
            if !session.active || session.position_seconds == seconds {
                return false;
            }
            session.position_seconds = seconds;
            true
        });
    }

    /// Flip the desired play state; ignored while inactive
    pub fn toggle_play(&self) {
        self.tx.send_if_modified(|session| {
            if !session.active {
                return false;
            }
            session.is_playing = !session.is_playing;
            debug!(playing = session.is_playing, "Play state toggled");
            true
        });
    }

    /// Mirror an observed play/pause transition; ignored while inactive
    pub fn set_playing(&self, playing: bool) {
        self.tx.send_if_modified(|session| {
            if !session.active || session.is_playing == playing {
                return false;
            }
            session.is_playing = playing;
            true
        });
    }

    /// Move the session to another surface if it still plays `stream_id`
    pub fn hand_off(&self, stream_id: &StreamId, surface: Surface) -> bool {
        let moved = self.tx.send_if_modified(|session| {
            if !session.active || session.stream_id.as_ref() != Some(stream_id) || session.surface == surface {
                return false;
            }
            session.surface = surface;
            true
        });
        if moved {
            info!(stream_id = %stream_id, surface = ?surface, "Playback session handed off");
        }
        moved
    }

    pub fn is_active(&self) -> bool {
        self.tx.borrow().active
    }

    /// Consistent copy of the current record
    pub fn snapshot(&self) -> PlaybackSession {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.tx.borrow())
            .finish()
    }
}

fn sanitize_position(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, position: f64) -> ActivateRequest {
        ActivateRequest {
            stream_id: StreamId::from(id),
            display_title: format!("Video {}", id),
            stream_url: Url::parse(&format!("https://cdn.example.com/hls/{}/master.m3u8", id)).unwrap(),
            position_seconds: position,
            is_playing: true,
            surface: Surface::Mini,
        }
    }

    #[test]
    fn test_activate_replaces_wholesale() {
        let store = SessionStore::new();
        store.activate(request(42, 10.0));
        store.activate(request(7, 3.0));

        let session = store.snapshot();
        assert_eq!(session.stream_id, Some(StreamId::from(7)));
        assert_eq!(session.display_title, "Video 7");
        assert_eq!(session.position_seconds, 3.0);
    }

    #[test]
    fn test_updates_ignored_while_inactive() {
        let store = SessionStore::new();
        store.update_position(12.0);
        store.toggle_play();
        store.set_playing(true);

        assert_eq!(store.snapshot(), PlaybackSession::inactive());
    }

    #[test]
    fn test_position_is_sanitized() {
        let store = SessionStore::new();
        store.activate(request(1, -4.0));
        assert_eq!(store.snapshot().position_seconds, 0.0);

        store.update_position(f64::NAN);
        assert_eq!(store.snapshot().position_seconds, 0.0);
    }

    #[test]
    fn test_hand_off_requires_same_stream() {
        let store = SessionStore::new();
        store.activate(ActivateRequest {
            surface: Surface::Full,
            ..request(5, 0.0)
        });

        assert!(!store.hand_off(&StreamId::from(6), Surface::Mini));
        assert!(store.hand_off(&StreamId::from(5), Surface::Mini));
        assert!(store.snapshot().is_mini());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.activate(request(3, 1.0));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().active);

        store.deactivate();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().active);
    }
}
