//! LocalTube Core - adaptive playback and player continuity
//!
//! This crate provides the playback side of the LocalTube client:
//! - HLS manifest parsing and segment loading
//! - Adaptive bitrate (ABR) selection with manual quality pinning
//! - Stream error recovery (restart load, decoder recovery, teardown)
//! - A shared playback session record for presenter handoff
//! - Full-page and floating mini-player presenters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        LocalTube Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐       ┌──────────────┐      ┌──────────────┐  │
//! │  │ Full Player  │◄─────►│   Session    │◄────►│ Mini Player  │  │
//! │  │  Presenter   │       │    Store     │      │  Presenter   │  │
//! │  └──────┬───────┘       └──────────────┘      └──────┬───────┘  │
//! │         │                                            │          │
//! │  ┌──────┴───────┐  ┌──────────────┐                  │          │
//! │  │   Quality    │  │   Position   │                  │          │
//! │  │  Controller  │  │   Tracker    │                  │          │
//! │  └──────┬───────┘  └──────────────┘                  │          │
//! │         │                                            │          │
//! │  ┌──────┴────────────────────────────────────────────┴───────┐  │
//! │  │              Media Session (one per render sink)          │  │
//! │  └──────┬───────────────────────────────────────────┬────────┘  │
//! │         │                                           │           │
//! │  ┌──────┴───────┐  ┌──────────────┐          ┌──────┴───────┐   │
//! │  │  HLS Engine  │──│     ABR      │          │ Render Sink  │   │
//! │  │ (m3u8, HTTP) │  │  Controller  │          │  (platform)  │   │
//! │  └──────────────┘  └──────────────┘          └──────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod manifest;
pub mod abr;
pub mod sink;
pub mod engine;
pub mod session;
pub mod quality;
pub mod tracker;
pub mod store;
pub mod route;
pub mod api;
pub mod presenter;

pub use error::{Error, Result, StreamError, StreamErrorKind};
pub use types::*;
pub use config::{ClientConfig, FullPlayerConfig, MiniPlayerConfig, PlayerConfig};
pub use manifest::{HttpManifestLoader, ManifestLoader};
pub use abr::{AbrAlgorithm, AbrController};
pub use sink::{RenderSink, SinkSlot};
pub use engine::{AdaptiveEngine, EngineEvent, EngineFactory, HlsEngine, HlsEngineFactory};
pub use session::{MediaSession, SessionEvent};
pub use quality::QualityController;
pub use tracker::PositionTracker;
pub use store::{ActivateRequest, SessionStore};
pub use route::{Navigator, PlayerRoute};
pub use api::{HttpVideoApi, VideoApi, VideoMetadata, VideoStatus};
pub use presenter::{FullPlayer, FullPlayerStatus, MiniPlayer, MiniPlayerView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the playback library
pub fn init() {
    tracing::info!(version = VERSION, "LocalTube Core initialized");
}
