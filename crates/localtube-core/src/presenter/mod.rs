//! Playback presenters
//!
//! The full player owns playback on the video page; the mini-player renders
//! the shared session as a floating overlay once the session is handed to it.
//! Both talk to each other only through the [`SessionStore`](crate::store::SessionStore).

mod drag;
mod full;
mod mini;

pub use drag::{DragPosition, Point, PointerListeners, PointerSubscription, PointerTarget, Viewport};
pub use full::{FullPlayer, FullPlayerStatus, FullPlayerView};
pub use mini::{MiniPlayer, MiniPlayerView};

/// Calm terminal message shown instead of a broken player
pub const UNAVAILABLE_MESSAGE: &str = "Video not available";
