//! Core types for LocalTube playback

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for one media session (one open of a stream on a sink)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a video on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for StreamId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns quality tier name
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One variant stream of an adaptive manifest, in manifest order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Position in the master playlist; the engine-level identifier
    pub index: usize,
    /// Bandwidth in bits per second
    pub bandwidth: u64,
    pub resolution: Option<Resolution>,
    pub codecs: Option<String>,
    /// URI of the variant media playlist
    pub uri: Url,
}

/// User-facing description of a selectable rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionDescriptor {
    pub index: usize,
    pub vertical_resolution: Option<u32>,
    pub bitrate: u64,
    pub display_label: String,
}

impl RenditionDescriptor {
    pub fn new(index: usize, vertical_resolution: Option<u32>, bitrate: u64) -> Self {
        let display_label = match vertical_resolution {
            Some(height) => format!("{}p", height),
            None => format!("Level {}", index),
        };

        Self {
            index,
            vertical_resolution,
            bitrate,
            display_label,
        }
    }
}

impl From<&Variant> for RenditionDescriptor {
    fn from(variant: &Variant) -> Self {
        Self::new(
            variant.index,
            variant.resolution.map(|r| r.height),
            variant.bandwidth,
        )
    }
}

/// Quality selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityMode {
    /// Engine picks the rendition from bandwidth estimates
    #[default]
    Auto,
    /// Engine is locked to the rendition with this index
    Pinned(usize),
}

impl QualityMode {
    /// Engine level to apply; `None` re-enables automatic selection
    pub fn level(&self) -> Option<usize> {
        match self {
            QualityMode::Auto => None,
            QualityMode::Pinned(index) => Some(*index),
        }
    }
}

/// Presenter that currently owns decoding of the shared session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Inline player on the video detail page
    #[default]
    Full,
    /// Floating mini-player
    Mini,
}

/// The single logical playback session shared between presenters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub active: bool,
    pub stream_id: Option<StreamId>,
    pub display_title: String,
    pub stream_url: Option<Url>,
    pub position_seconds: f64,
    /// Desired play state; the decoder may lag behind it
    pub is_playing: bool,
    pub surface: Surface,
}

impl PlaybackSession {
    /// The inactive record
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Whether the mini-player should be showing this session
    pub fn is_mini(&self) -> bool {
        self.active && self.surface == Surface::Mini && self.stream_url.is_some()
    }
}

/// How a media session is rendering its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Adaptive engine feeds segments to the sink
    Adaptive,
    /// URL handed to the sink's built-in playback
    Native,
    /// Neither path is available on this platform
    Unavailable,
}

/// Media session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Manifest requested, not parsed yet
    Loading,
    /// Manifest parsed (or native metadata loaded)
    Ready,
    /// A fatal error is being recovered in place
    Recovering,
    /// Recovery impossible; the session has been torn down
    Failed,
    /// Closed by its owner
    Closed,
}

impl PlayerState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlayerState) -> bool {
        use PlayerState::*;
        matches!(
            (self, target),
            (Loading, Ready) | (Loading, Recovering) | (Loading, Failed) | (Loading, Closed) |
            (Ready, Recovering) | (Ready, Failed) | (Ready, Closed) |
            (Recovering, Ready) | (Recovering, Recovering) | (Recovering, Failed) | (Recovering, Closed) |
            (Failed, Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Failed | PlayerState::Closed)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Ready => write!(f, "ready"),
            PlayerState::Recovering => write!(f, "recovering"),
            PlayerState::Failed => write!(f, "failed"),
            PlayerState::Closed => write!(f, "closed"),
        }
    }
}

/// Notifications coming from the render sink (media element events)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: Option<f64> },
    TimeUpdate(f64),
    Play,
    Pause,
    Ended,
}
