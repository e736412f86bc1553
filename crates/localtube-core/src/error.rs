//! Error types for LocalTube Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Manifest errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Invalid manifest format: {0}")]
    InvalidManifest(String),

    // Segment errors
    #[error("Failed to fetch segment: {url}")]
    SegmentFetch { url: String, source: reqwest::Error },

    // Session errors
    #[error("Render sink {sink} already has an attached media session")]
    SinkBusy { sink: String },

    #[error("Media session is closed")]
    SessionClosed,

    #[error("No rendition with index {index}")]
    NoSuchRendition { index: usize },

    #[error("Quality selection is not available for this stream")]
    QualityUnavailable,

    #[error("Invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Routing
    #[error("Invalid player route: {0}")]
    InvalidRoute(String),

    // Backend API errors
    #[error("API request {endpoint} failed with HTTP {status}")]
    Api { status: u16, endpoint: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if a retry of the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ManifestFetch(_) | Error::SegmentFetch { .. } | Error::Network(_)
        ) || matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::InvalidManifest(_) => "INVALID_MANIFEST",
            Error::SegmentFetch { .. } => "SEGMENT_FETCH",
            Error::SinkBusy { .. } => "SINK_BUSY",
            Error::SessionClosed => "SESSION_CLOSED",
            Error::NoSuchRendition { .. } => "NO_RENDITION",
            Error::QualityUnavailable => "QUALITY_UNAVAILABLE",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::InvalidRoute(_) => "INVALID_ROUTE",
            Error::Api { .. } => "API",
            Error::Network(_) => "NETWORK",
            Error::Url(_) => "URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

/// Classification of an adaptive-engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// Manifest or segment could not be loaded
    Network,
    /// Decoder rejected or failed on appended media
    Media,
    /// Anything else; not recoverable in place
    Other,
}

impl std::fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamErrorKind::Network => write!(f, "network"),
            StreamErrorKind::Media => write!(f, "media"),
            StreamErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error reported by an adaptive engine through its event stream
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} stream error (fatal: {fatal}): {details}")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub fatal: bool,
    pub details: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, fatal: bool, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal,
            details: details.into(),
        }
    }

    pub fn fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self::new(kind, true, details)
    }

    pub fn non_fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self::new(kind, false, details)
    }
}

/// Failure returned by `RenderSink::play`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    /// The platform refused to start playback without a user gesture
    #[error("autoplay was rejected by the platform")]
    AutoplayRejected,

    #[error("playback could not start: {0}")]
    Failed(String),
}

/// Failure returned by `RenderSink::append_segment`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render sink rejected media: {0}")]
pub struct SinkError(pub String);
