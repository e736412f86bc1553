//! Backend REST client
//!
//! Endpoints used by the player:
//! - `GET /videos/{id}` video metadata
//! - `POST /videos/{id}/view` view counting
//! - `POST|DELETE /videos/{id}/like` and `GET /videos/{id}/like-status`

use crate::{Error, Result, StreamId};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Qualities offered for download when the backend does not list any
pub const DEFAULT_DOWNLOAD_QUALITIES: [&str; 3] = ["1080p", "720p", "480p"];

/// Processing status of an uploaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploading,
    Processing,
    Ready,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Video metadata as returned by `GET /videos/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: StreamId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uploader_name: Option<String>,
    /// Adaptive manifest; only present once the video is ready
    #[serde(default)]
    pub hls_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub status: Option<VideoStatus>,
    #[serde(default, alias = "availableQualities")]
    pub qualities: Option<Vec<String>>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
}

impl VideoMetadata {
    pub fn is_ready(&self) -> bool {
        self.status == Some(VideoStatus::Ready)
    }

    /// Manifest URL when the video can be played
    ///
    /// The backend hands out origin-relative paths (`/hls/{id}/master.m3u8`);
    /// they are resolved against `base`. Absolute URLs are kept as they are.
    pub fn playable_url(&self, base: &Url) -> Option<Result<Url>> {
        match &self.hls_url {
            Some(url) if self.is_ready() && !url.is_empty() => Some(base.join(url).map_err(Error::from)),
            _ => None,
        }
    }

    /// Thumbnail image URL resolved against `base`
    pub fn thumbnail(&self, base: &Url) -> Option<Result<Url>> {
        self.thumbnail_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| base.join(url).map_err(Error::from))
    }

    /// Message shown instead of the player
    pub fn unavailable_message(&self) -> &'static str {
        if self.status == Some(VideoStatus::Processing) {
            "Video is being processed..."
        } else {
            "Video not available"
        }
    }
}

/// Origin of the backend serving media paths, derived from the API base URL
///
/// `http://localhost:8080/api` serves streams under `http://localhost:8080/`.
pub fn media_origin(api_base_url: &str) -> Result<Url> {
    Ok(Url::parse(api_base_url)?.join("/")?)
}

/// Qualities offered for per-quality download; empty until the video is ready
pub fn download_qualities(video: &VideoMetadata) -> Vec<String> {
    if !video.is_ready() || video.hls_url.is_none() {
        return Vec::new();
    }
    match &video.qualities {
        Some(qualities) if !qualities.is_empty() => qualities.clone(),
        _ => DEFAULT_DOWNLOAD_QUALITIES.iter().map(|q| q.to_string()).collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
}

/// Result of liking or unliking a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    #[serde(default)]
    pub likes: Option<u64>,
}

/// Backend operations used by the player
#[async_trait]
pub trait VideoApi: Send + Sync {
    async fn get_video(&self, id: &StreamId) -> Result<VideoMetadata>;

    /// Count one view
    async fn increment_view(&self, id: &StreamId) -> Result<()>;

    async fn like(&self, id: &StreamId) -> Result<LikeResponse>;

    async fn unlike(&self, id: &StreamId) -> Result<LikeResponse>;

    async fn like_status(&self, id: &StreamId) -> Result<LikeStatus>;

    /// Base that relative media paths in [`VideoMetadata`] resolve against
    fn media_base(&self) -> &Url;
}

/// [`VideoApi`] over HTTP
#[derive(Clone)]
pub struct HttpVideoApi {
    client: Client,
    base_url: String,
    media_base: Url,
    token: Option<String>,
}

impl HttpVideoApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let media_base = media_origin(&base_url)?;

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            media_base,
            token,
        })
    }

    /// Client from the top-level configuration
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            Duration::from_millis(config.player.request_timeout_ms),
        )
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, endpoint));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, method: Method, endpoint: &str) -> Result<Response> {
        debug!(method = method.as_str(), endpoint, "API request");
        let response = self.request(method, endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VideoApi for HttpVideoApi {
    #[instrument(skip(self))]
    async fn get_video(&self, id: &StreamId) -> Result<VideoMetadata> {
        let response = self.send(Method::GET, &format!("/videos/{}", id)).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn increment_view(&self, id: &StreamId) -> Result<()> {
        self.send(Method::POST, &format!("/videos/{}/view", id)).await?;
        Ok(())
    }

    async fn like(&self, id: &StreamId) -> Result<LikeResponse> {
        let response = self.send(Method::POST, &format!("/videos/{}/like", id)).await?;
        Ok(response.json().await?)
    }

    async fn unlike(&self, id: &StreamId) -> Result<LikeResponse> {
        let response = self.send(Method::DELETE, &format!("/videos/{}/like", id)).await?;
        Ok(response.json().await?)
    }

    async fn like_status(&self, id: &StreamId) -> Result<LikeStatus> {
        let response = self.send(Method::GET, &format!("/videos/{}/like-status", id)).await?;
        Ok(response.json().await?)
    }

    fn media_base(&self) -> &Url {
        &self.media_base
    }
}
