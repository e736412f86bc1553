//! Player routes (`/video/{id}?t={seconds}`) and navigation

use crate::{Error, Result, StreamId};
use serde::Serialize;
use url::Url;

/// Base used to resolve relative paths while parsing
const ROUTE_BASE: &str = "http://localtube.invalid/";

/// Route to the full player page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlayerRoute {
    pub video_id: StreamId,
    /// Whole seconds to start from (`?t=`)
    pub start_seconds: Option<u64>,
}

impl PlayerRoute {
    pub fn new(video_id: impl Into<StreamId>) -> Self {
        Self {
            video_id: video_id.into(),
            start_seconds: None,
        }
    }

    /// Route resuming at `position`, floored to whole seconds
    pub fn from_position(video_id: impl Into<StreamId>, position: f64) -> Self {
        Self {
            video_id: video_id.into(),
            start_seconds: whole_seconds(position),
        }
    }

    /// Start position in seconds; zero without `?t=`
    pub fn start_position(&self) -> f64 {
        self.start_seconds.unwrap_or(0) as f64
    }

    /// Path with the id percent-encoded as one segment
    pub fn to_path(&self) -> String {
        let id = urlencoding::encode(self.video_id.as_str());
        match self.start_seconds {
            Some(t) => format!("/video/{}?t={}", id, t),
            None => format!("/video/{}", id),
        }
    }

    /// Parse a path such as `/video/abc?t=120`; a malformed `t` is ignored
    pub fn parse(path: &str) -> Result<Self> {
        let url = Url::parse(ROUTE_BASE)?.join(path)?;

        let segments: Vec<_> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let video_id = match segments.as_slice() {
            ["video", id] => urlencoding::decode(id)
                .map(|id| StreamId::new(id.into_owned()))
                .map_err(|_| Error::InvalidRoute(path.to_string()))?,
            _ => return Err(Error::InvalidRoute(path.to_string())),
        };

        let start_seconds = url
            .query_pairs()
            .find(|(key, _)| key == "t")
            .and_then(|(_, value)| value.parse::<f64>().ok())
            .and_then(whole_seconds);

        Ok(Self { video_id, start_seconds })
    }
}

impl std::fmt::Display for PlayerRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_path())
    }
}

fn whole_seconds(position: f64) -> Option<u64> {
    (position.is_finite() && position >= 0.0).then(|| position.floor() as u64)
}

/// Page navigation performed by presenters
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &PlayerRoute);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_position_floors() {
        let route = PlayerRoute::from_position("abc", 120.4);
        assert_eq!(route.to_path(), "/video/abc?t=120");
        assert_eq!(route.start_position(), 120.0);
    }

    #[test]
    fn test_parse() {
        let route = PlayerRoute::parse("/video/42?t=75").unwrap();
        assert_eq!(route.video_id, StreamId::from(42));
        assert_eq!(route.start_seconds, Some(75));

        let route = PlayerRoute::parse("/video/42?t=nope").unwrap();
        assert_eq!(route.start_seconds, None);
        assert_eq!(route.to_path(), "/video/42");
    }

    #[test]
    fn test_id_is_escaped_in_path() {
        let route = PlayerRoute::from_position("a b/c?d#e", 9.0);
        assert_eq!(route.to_path(), "/video/a%20b%2Fc%3Fd%23e?t=9");

        let parsed = PlayerRoute::parse(&route.to_path()).unwrap();
        assert_eq!(parsed, route);
        assert_eq!(PlayerRoute::parse("/video/caf%C3%A9").unwrap().video_id, StreamId::new("café"));
        assert!(PlayerRoute::parse("/video/%FF").is_err());
    }

    #[test]
    fn test_parse_rejects_other_pages() {
        assert!(PlayerRoute::parse("/channel/42").is_err());
        assert!(PlayerRoute::parse("/video").is_err());
    }
}
