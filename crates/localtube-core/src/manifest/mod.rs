//! Adaptive manifest model, loaders and stream URL conventions

mod hls;

pub use hls::{parse_manifest, parse_media_playlist, HttpManifestLoader};

use crate::{Error, Result, Variant};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use url::Url;

/// MIME type a sink reports for built-in HLS playback
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// File name of the adaptive manifest under a stream base
pub const MASTER_MANIFEST: &str = "master.m3u8";

/// Parsed entry manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Variants in manifest order; a media playlist entry point yields one
    pub variants: Vec<Variant>,
    /// Whether the entry point was a master (multivariant) playlist
    pub is_master: bool,
    /// Base URL for resolving relative URIs
    pub base_url: Url,
}

/// One media segment with its position on the presentation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Media sequence number
    pub number: u64,
    pub uri: Url,
    /// Start time in seconds from the first segment
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }
}

/// Parsed media playlist for one variant
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
    /// `#EXT-X-ENDLIST` present
    pub ended: bool,
    pub target_duration: Duration,
}

impl MediaPlaylist {
    /// Total duration of all segments
    pub fn duration(&self) -> f64 {
        self.segments.last().map(Segment::end).unwrap_or(0.0)
    }

    /// Segment covering `time`; times past the end map to nothing
    pub fn segment_at(&self, time: f64) -> Option<&Segment> {
        let time = time.max(0.0);
        self.segments.iter().find(|s| s.contains(time))
    }
}

/// Loads manifests over the network (or any other transport)
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    /// Fetch and parse the entry manifest
    async fn load_manifest(&self, url: &Url) -> Result<Manifest>;

    /// Fetch and parse a variant media playlist
    async fn load_media_playlist(&self, url: &Url) -> Result<MediaPlaylist>;

    /// Fetch the bytes of one media segment
    async fn load_segment(&self, url: &Url) -> Result<Bytes>;
}

/// Whether the URL points at an HLS playlist
pub fn is_hls_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".m3u")
}

/// `{base}/master.m3u8`
pub fn master_manifest_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(MASTER_MANIFEST)?)
}

/// Quality-pinned playlist for a stream: `{base}/{quality}/index.m3u8`
///
/// `stream_url` is the resolved adaptive manifest URL (`{base}/master.m3u8`)
/// or the stream base itself.
pub fn quality_playlist_url(stream_url: &Url, quality: &str) -> Result<Url> {
    let quality = quality.trim_matches('/');
    if quality.is_empty() {
        return Err(Error::InvalidManifest("empty quality name".into()));
    }

    let mut base = stream_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') && !base.path().ends_with(&format!("/{}", MASTER_MANIFEST)) {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok(base.join(&format!("{}/index.m3u8", urlencoding::encode(quality)))?)
}
