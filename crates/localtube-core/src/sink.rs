//! Render sink abstraction
//!
//! A render sink is the platform's media output surface (a `<video>` element,
//! a GStreamer pipeline, ...). The playback core only talks to it through
//! [`RenderSink`], and guards it with a [`SinkSlot`] so that at most one
//! media session is attached to a sink at any time.

use crate::error::{PlayError, SinkError};
use crate::{Error, Result, SessionId};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

/// Media output surface driven by a media session
pub trait RenderSink: Send + Sync {
    /// Stable name for logs and errors
    fn name(&self) -> &str;

    /// Current media clock time in seconds
    fn current_time(&self) -> f64;

    /// Seek the media clock
    fn set_current_time(&self, seconds: f64);

    fn is_paused(&self) -> bool;

    /// Start playback; platforms may reject autoplay
    fn play(&self) -> std::result::Result<(), PlayError>;

    fn pause(&self);

    /// Output volume in `0.0..=1.0`
    fn set_volume(&self, volume: f64);

    fn set_muted(&self, muted: bool);

    /// Whether the sink can natively play the given MIME type
    fn can_play_type(&self, mime: &str) -> bool;

    /// Assign (or clear) the native source URL
    fn set_source(&self, url: Option<&Url>);

    /// Feed one media segment of the given level to the decoder
    fn append_segment(&self, level: usize, data: Bytes) -> std::result::Result<(), SinkError>;

    /// Seconds buffered contiguously ahead of the current time
    fn buffered_ahead(&self) -> f64;

    /// Drop decoder state and buffered media after a decode failure
    fn reset_decoder(&self);
}

/// Ownership slot around a render sink
///
/// Opening a media session attaches it to the slot; closing detaches it.
pub struct SinkSlot {
    sink: Arc<dyn RenderSink>,
    attached: Mutex<Option<SessionId>>,
}

impl SinkSlot {
    pub fn new(sink: Arc<dyn RenderSink>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            attached: Mutex::new(None),
        })
    }

    pub fn sink(&self) -> &Arc<dyn RenderSink> {
        &self.sink
    }

    /// Session currently attached, if any
    pub fn attached(&self) -> Option<SessionId> {
        *self.lock()
    }

    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    /// Attach a session; fails if another one holds the sink
    pub(crate) fn attach(&self, session: SessionId) -> Result<()> {
        let mut attached = self.lock();
        match *attached {
            Some(current) if current != session => Err(Error::SinkBusy {
                sink: self.sink.name().to_string(),
            }),
            _ => {
                *attached = Some(session);
                debug!(sink = self.sink.name(), session = %session, "Session attached");
                Ok(())
            }
        }
    }

    /// Detach a session; a no-op for sessions that do not hold the sink
    pub(crate) fn detach(&self, session: SessionId) {
        let mut attached = self.lock();
        if *attached == Some(session) {
            *attached = None;
            debug!(sink = self.sink.name(), session = %session, "Session detached");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionId>> {
        // A poisoned slot still holds a valid Option
        self.attached.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSlot")
            .field("sink", &self.sink.name())
            .field("attached", &self.attached())
            .finish()
    }
}

/// Start playback, treating autoplay rejection as a normal outcome
pub(crate) fn play_tolerant(sink: &dyn RenderSink) {
    match sink.play() {
        Ok(()) => {}
        Err(PlayError::AutoplayRejected) => {
            debug!(sink = sink.name(), "Autoplay rejected by platform");
        }
        Err(e) => {
            tracing::warn!(sink = sink.name(), error = %e, "Play request failed");
        }
    }
}
