//! CLI command implementations

use crate::output::{format_record, format_rows};
use console::style;
use localtube_core::api::{download_qualities, media_origin};
use localtube_core::manifest::quality_playlist_url;
use localtube_core::{
    ClientConfig, HttpManifestLoader, HttpVideoApi, ManifestLoader, PlayerRoute, QualityController, StreamId,
    Variant, VideoApi,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tabled::Tabled;
use tracing::{debug, info};
use url::Url;

#[derive(Tabled, Serialize)]
struct RenditionRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Bitrate")]
    bitrate: String,
    #[tabled(rename = "Playlist")]
    playlist: String,
}

#[derive(Tabled, Serialize)]
struct SegmentRow {
    #[tabled(rename = "#")]
    number: u64,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "URI")]
    uri: String,
}

#[derive(Serialize)]
struct VideoSummary {
    id: String,
    title: String,
    status: String,
    uploader: Option<String>,
    duration: Option<u64>,
    views: Option<u64>,
    likes: Option<u64>,
    playable: Option<String>,
    thumbnail: Option<String>,
    downloads: Vec<String>,
}

/// Load the client config, falling back to defaults without a file
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading client config");
            Ok(ClientConfig::from_file(path)?)
        }
        None => Ok(ClientConfig::default()),
    }
}

fn manifest_loader(config: &ClientConfig) -> anyhow::Result<HttpManifestLoader> {
    Ok(HttpManifestLoader::new(Duration::from_millis(config.player.request_timeout_ms))?)
}

fn format_bitrate(bps: u64) -> String {
    if bps >= 1_000_000 {
        format!("{:.1} Mbps", bps as f64 / 1_000_000.0)
    } else {
        format!("{} kbps", bps / 1000)
    }
}

/// List renditions in quality-selector order
pub async fn renditions(config: &ClientConfig, manifest_url: &str, format: &str) -> anyhow::Result<()> {
    let url = Url::parse(manifest_url)?;
    info!(url = %url, "Loading manifest");

    let manifest = manifest_loader(config)?.load_manifest(&url).await?;
    let mut quality = QualityController::new();
    quality.on_manifest_parsed(&manifest.variants);
    let rows = rendition_rows(&quality, &manifest.variants);

    println!("{}", format_rows(&rows, format));

    if !quality.should_render() {
        println!(
            "{}",
            style("Single rendition: the quality selector is hidden").yellow()
        );
    }

    Ok(())
}

fn rendition_rows(quality: &QualityController, variants: &[Variant]) -> Vec<RenditionRow> {
    quality
        .list_renditions()
        .iter()
        .filter_map(|descriptor| {
            let variant = variants.iter().find(|v| v.index == descriptor.index)?;
            Some(RenditionRow {
                index: descriptor.index,
                label: descriptor.display_label.clone(),
                tier: variant
                    .resolution
                    .map(|r| r.quality_name().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                bitrate: format_bitrate(descriptor.bitrate),
                playlist: variant.uri.to_string(),
            })
        })
        .collect()
}

/// List the first segments of one rendition
pub async fn segments(
    config: &ClientConfig,
    manifest_url: &str,
    level: usize,
    limit: usize,
    format: &str,
) -> anyhow::Result<()> {
    let url = Url::parse(manifest_url)?;
    let loader = manifest_loader(config)?;

    let manifest = loader.load_manifest(&url).await?;
    let variant = manifest
        .variants
        .iter()
        .find(|v| v.index == level)
        .ok_or_else(|| anyhow::anyhow!("No rendition at index {} ({} available)", level, manifest.variants.len()))?;

    let playlist = loader.load_media_playlist(&variant.uri).await?;
    let rows: Vec<SegmentRow> = playlist
        .segments
        .iter()
        .take(limit)
        .map(|s| SegmentRow {
            number: s.number,
            start: format!("{:.3}s", s.start),
            duration: format!("{:.3}s", s.duration),
            uri: s.uri.to_string(),
        })
        .collect();

    println!("{}", format_rows(&rows, format));

    if playlist.segments.len() > limit {
        println!("  ... and {} more", playlist.segments.len() - limit);
    }
    println!(
        "Total: {} segments, {:.1}s{}",
        playlist.segments.len(),
        playlist.duration(),
        if playlist.ended { "" } else { " (live)" }
    );

    Ok(())
}

/// Show video metadata and what the player would do with it
pub async fn video(config: &ClientConfig, id: &str, format: &str) -> anyhow::Result<()> {
    let api = HttpVideoApi::from_config(config)?;
    let video = api.get_video(&StreamId::from(id)).await?;

    let playable = video.playable_url(api.media_base()).transpose()?.map(|u| u.to_string());
    let thumbnail = video.thumbnail(api.media_base()).transpose()?.map(|u| u.to_string());
    let summary = VideoSummary {
        id: video.id.to_string(),
        title: video.title.clone(),
        status: video
            .status
            .map(|s| format!("{:?}", s).to_lowercase())
            .unwrap_or_else(|| "unknown".to_string()),
        uploader: video.uploader_name.clone(),
        duration: video.duration,
        views: video.views,
        likes: video.likes,
        playable,
        thumbnail,
        downloads: download_qualities(&video),
    };

    println!("{}", format_record(&summary, format));

    if summary.playable.is_some() {
        println!("{}", style("Ready to play").green().bold());
    } else {
        println!("{}", style(video.unavailable_message()).red());
    }

    Ok(())
}

/// Resolve the per-quality playlist URL used for downloads
///
/// Origin-relative stream paths resolve against the configured backend.
pub fn download_url(config: &ClientConfig, hls_url: &str, quality: &str) -> anyhow::Result<()> {
    println!("{}", resolve_download_url(config, hls_url, quality)?);
    Ok(())
}

fn resolve_download_url(config: &ClientConfig, hls_url: &str, quality: &str) -> anyhow::Result<Url> {
    let stream = media_origin(&config.api_base_url)?.join(hls_url)?;
    Ok(quality_playlist_url(&stream, quality)?)
}

/// Parse a player route
pub fn route(path: &str, format: &str) -> anyhow::Result<()> {
    let route = PlayerRoute::parse(path)?;
    println!("{}", format_record(&route, format));
    println!("Canonical: {}", style(route.to_path()).cyan());
    Ok(())
}
