//! Adaptive streaming engine interface
//!
//! An engine loads an adaptive manifest, chooses levels and feeds segments
//! into a render sink. It reports progress as [`EngineEvent`]s on an
//! unbounded channel owned by the media session that created it.

mod hls;

pub use hls::{HlsEngine, HlsEngineFactory};

use crate::error::StreamError;
use crate::sink::RenderSink;
use crate::Variant;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Sender half handed to engines
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Events emitted by an adaptive engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Manifest loaded and parsed; levels are in manifest order
    ManifestParsed { levels: Vec<Variant> },
    /// The level being rendered changed
    LevelSwitched { level: usize },
    /// Something went wrong; `fatal` errors stop loading
    Error(StreamError),
}

/// Adaptive engine operating on one sink
pub trait AdaptiveEngine: Send {
    /// Begin loading the manifest, then segments from `start_position`
    fn load_source(&mut self, url: &Url, start_position: f64);

    /// Restart loading from `position` without rebuilding the engine
    fn start_load(&mut self, position: f64);

    /// Reset the decoder and resume loading after a media error
    fn recover_media_error(&mut self);

    /// Parsed levels, empty before the manifest arrives
    fn levels(&self) -> Vec<Variant>;

    /// Level currently rendered (auto or pinned)
    fn current_level(&self) -> Option<usize>;

    /// Lock to a level, or `None` to re-enable automatic selection
    fn set_current_level(&mut self, level: Option<usize>);

    fn auto_level_enabled(&self) -> bool;

    /// Stop all loading and release resources; idempotent
    fn destroy(&mut self);
}

/// Creates engines bound to a sink
pub trait EngineFactory: Send + Sync {
    /// Whether adaptive streaming works on this platform
    fn is_supported(&self) -> bool;

    fn create(&self, sink: Arc<dyn RenderSink>, events: EngineEventSender) -> Box<dyn AdaptiveEngine>;
}
