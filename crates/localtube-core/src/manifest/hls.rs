//! HLS (HTTP Live Streaming) playlist parsing
//!
//! Handles:
//! - Master playlists (multivariant), keeping manifest order
//! - Media playlists as entry point (single rendition)
//! - Segment timelines for variant playlists

use super::{Manifest, ManifestLoader, MediaPlaylist, Segment};
use crate::{error::Error, Resolution, Result, Variant};
use async_trait::async_trait;
use bytes::Bytes;
use m3u8_rs::{MasterPlaylist, MediaPlaylist as M3u8MediaPlaylist};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Parse an entry manifest; media playlists become a single variant
pub fn parse_manifest(content: &str, url: &Url) -> Result<Manifest> {
    if !content.trim_start().starts_with("#EXTM3U") {
        return Err(Error::InvalidManifest("missing #EXTM3U header".into()));
    }

    if content.contains("#EXT-X-STREAM-INF") {
        let parsed = m3u8_rs::parse_master_playlist_res(content.as_bytes())
            .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS master: {:?}", e)))?;

        Ok(Manifest {
            variants: extract_variants(&parsed, url)?,
            is_master: true,
            base_url: url.clone(),
        })
    } else {
        // Validate it is a usable media playlist before exposing it
        parse_media_playlist(content, url)?;

        Ok(Manifest {
            variants: vec![Variant {
                index: 0,
                bandwidth: 0,
                resolution: None,
                codecs: None,
                uri: url.clone(),
            }],
            is_master: false,
            base_url: url.clone(),
        })
    }
}

/// Extract variants from a master playlist, skipping I-frame-only streams
fn extract_variants(master: &MasterPlaylist, base_url: &Url) -> Result<Vec<Variant>> {
    master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .enumerate()
        .map(|(index, variant)| {
            Ok(Variant {
                index,
                bandwidth: variant.bandwidth,
                resolution: variant.resolution.and_then(|r| {
                    Some(Resolution::new(u32::try_from(r.width).ok()?, u32::try_from(r.height).ok()?))
                }),
                codecs: variant.codecs.clone(),
                uri: resolve_uri(base_url, &variant.uri)?,
            })
        })
        .collect()
}

/// Parse a media playlist into a segment timeline
pub fn parse_media_playlist(content: &str, url: &Url) -> Result<MediaPlaylist> {
    let parsed = m3u8_rs::parse_media_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS media: {:?}", e)))?;

    Ok(MediaPlaylist {
        segments: extract_segments(&parsed, url)?,
        ended: parsed.end_list,
        target_duration: Duration::from_secs(parsed.target_duration),
    })
}

fn extract_segments(media: &M3u8MediaPlaylist, base_url: &Url) -> Result<Vec<Segment>> {
    let mut start = 0.0;
    let mut segments = Vec::with_capacity(media.segments.len());

    for (idx, seg) in media.segments.iter().enumerate() {
        let duration = seg.duration as f64;
        segments.push(Segment {
            number: media.media_sequence + idx as u64,
            uri: resolve_uri(base_url, &seg.uri)?,
            start,
            duration,
        });
        start += duration;
    }

    Ok(segments)
}

/// Resolve relative URI against base URL
fn resolve_uri(base: &Url, relative: &str) -> Result<Url> {
    base.join(relative)
        .map_err(|e| Error::InvalidManifest(format!("Invalid URI '{}': {}", relative, e)))
}

/// Manifest loader over HTTP
#[derive(Clone)]
pub struct HttpManifestLoader {
    client: Client,
}

impl HttpManifestLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::ManifestFetch(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| Error::ManifestFetch(e.to_string()))
    }
}

#[async_trait]
impl ManifestLoader for HttpManifestLoader {
    #[instrument(skip(self))]
    async fn load_manifest(&self, url: &Url) -> Result<Manifest> {
        debug!("Fetching HLS manifest: {}", url);
        let content = self.fetch_text(url).await?;
        parse_manifest(&content, url)
    }

    #[instrument(skip(self))]
    async fn load_media_playlist(&self, url: &Url) -> Result<MediaPlaylist> {
        debug!("Fetching HLS variant playlist: {}", url);
        let content = self.fetch_text(url).await?;
        parse_media_playlist(&content, url)
    }

    async fn load_segment(&self, url: &Url) -> Result<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::SegmentFetch {
                url: url.to_string(),
                source: e,
            })?;

        response.bytes().await.map_err(|e| Error::SegmentFetch {
            url: url.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d401e,mp4a.40.2\"
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
1080p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p/index.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:6.0,
seg0.ts
#EXTINF:6.0,
seg1.ts
#EXTINF:4.5,
seg2.ts
#EXT-X-ENDLIST
";

    #[test]
    fn test_master_keeps_manifest_order() {
        let url = Url::parse("https://cdn.example.com/hls/abc/master.m3u8").unwrap();
        let manifest = parse_manifest(MASTER, &url).unwrap();

        assert!(manifest.is_master);
        let heights: Vec<_> = manifest
            .variants
            .iter()
            .map(|v| v.resolution.map(|r| r.height))
            .collect();
        assert_eq!(heights, vec![Some(360), Some(1080), Some(720)]);
        assert_eq!(manifest.variants[1].index, 1);
        assert_eq!(manifest.variants[1].bandwidth, 5_000_000);
        assert_eq!(
            manifest.variants[2].uri.as_str(),
            "https://cdn.example.com/hls/abc/720p/index.m3u8"
        );
    }

    #[test]
    fn test_out_of_range_attributes() {
        let master = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=900000,RESOLUTION=8589934592x1080
huge/index.m3u8
";
        let url = Url::parse("https://cdn.example.com/hls/abc/master.m3u8").unwrap();
        let manifest = parse_manifest(master, &url).unwrap();
        assert_eq!(manifest.variants[0].resolution, Some(Resolution::new(640, 360)));
        assert_eq!(manifest.variants[1].resolution, None);

        let media = MEDIA.replace("#EXT-X-TARGETDURATION:6", "#EXT-X-TARGETDURATION:18446744073709551615");
        let playlist = parse_media_playlist(&media, &url).unwrap();
        assert_eq!(playlist.target_duration, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_media_entry_point_is_single_variant() {
        let url = Url::parse("https://cdn.example.com/hls/abc/720p/index.m3u8").unwrap();
        let manifest = parse_manifest(MEDIA, &url).unwrap();

        assert!(!manifest.is_master);
        assert_eq!(manifest.variants.len(), 1);
        assert_eq!(manifest.variants[0].uri, url);
    }

    #[test]
    fn test_media_timeline() {
        let url = Url::parse("https://cdn.example.com/hls/abc/720p/index.m3u8").unwrap();
        let playlist = parse_media_playlist(MEDIA, &url).unwrap();

        assert!(playlist.ended);
        assert_eq!(playlist.segments.len(), 3);
        assert_eq!(playlist.segments[2].start, 12.0);
        assert_eq!(playlist.duration(), 16.5);
        assert_eq!(
            playlist.segments[0].uri.as_str(),
            "https://cdn.example.com/hls/abc/720p/seg0.ts"
        );
    }

    #[test]
    fn test_rejects_non_playlist() {
        let url = Url::parse("https://cdn.example.com/hls/abc/master.m3u8").unwrap();
        assert!(parse_manifest("<html>not found</html>", &url).is_err());
    }
}
