//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use localtube_core::api::{LikeResponse, LikeStatus, VideoApi, VideoMetadata, VideoStatus};
use localtube_core::engine::{AdaptiveEngine, EngineEvent, EngineEventSender, EngineFactory};
use localtube_core::error::{PlayError, SinkError};
use localtube_core::manifest::{parse_manifest, parse_media_playlist, Manifest, ManifestLoader, MediaPlaylist, HLS_MIME};
use localtube_core::route::{Navigator, PlayerRoute};
use localtube_core::sink::RenderSink;
use localtube_core::{Error, Resolution, Result, StreamId, Variant};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

// =============================================================================
// Render sink
// =============================================================================

#[derive(Debug, Default)]
pub struct SinkState {
    pub time: f64,
    pub paused: bool,
    pub source: Option<Url>,
    pub appended: Vec<(usize, usize)>,
    /// Segments appended since the last decoder reset
    pub buffered_segments: usize,
    pub play_calls: usize,
    pub resets: usize,
    pub volume: Option<f64>,
    pub muted: bool,
}

pub struct FakeSink {
    name: String,
    pub state: Mutex<SinkState>,
    pub reject_autoplay: bool,
    pub native_hls: bool,
    pub reject_appends: bool,
    /// Seconds of media per appended segment
    pub segment_seconds: f64,
}

impl FakeSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(SinkState {
                paused: true,
                ..Default::default()
            }),
            reject_autoplay: false,
            native_hls: false,
            reject_appends: false,
            segment_seconds: 4.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    pub fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    pub fn volume(&self) -> Option<f64> {
        self.state.lock().unwrap().volume
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn source(&self) -> Option<Url> {
        self.state.lock().unwrap().source.clone()
    }

    pub fn appended(&self) -> Vec<(usize, usize)> {
        self.state.lock().unwrap().appended.clone()
    }

    /// Simulate the media clock advancing while playing
    pub fn set_playing_at(&self, time: f64) {
        let mut state = self.state.lock().unwrap();
        state.time = time;
        state.paused = false;
    }
}

impl RenderSink for FakeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_time(&self) -> f64 {
        self.time()
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().unwrap().time = seconds;
    }

    fn is_paused(&self) -> bool {
        self.paused()
    }

    fn play(&self) -> std::result::Result<(), PlayError> {
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        if self.reject_autoplay {
            return Err(PlayError::AutoplayRejected);
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().unwrap().volume = Some(volume);
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.native_hls && mime == HLS_MIME
    }

    fn set_source(&self, url: Option<&Url>) {
        self.state.lock().unwrap().source = url.cloned();
    }

    fn append_segment(&self, level: usize, data: Bytes) -> std::result::Result<(), SinkError> {
        if self.reject_appends {
            return Err(SinkError("bufferAppendError".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.appended.push((level, data.len()));
        state.buffered_segments += 1;
        Ok(())
    }

    fn buffered_ahead(&self) -> f64 {
        self.state.lock().unwrap().buffered_segments as f64 * self.segment_seconds
    }

    fn reset_decoder(&self) {
        let mut state = self.state.lock().unwrap();
        state.buffered_segments = 0;
        state.resets += 1;
    }
}

// =============================================================================
// Adaptive engine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    LoadSource(Url, f64),
    StartLoad(f64),
    RecoverMediaError,
    SetLevel(Option<usize>),
    Destroy,
}

#[derive(Default)]
struct EngineShared {
    calls: Vec<EngineCall>,
    sender: Option<EngineEventSender>,
    levels: Vec<Variant>,
    manual_level: Option<usize>,
}

/// Engine factory whose engines only record calls; events are injected by the test
#[derive(Clone)]
pub struct FakeFactory {
    supported: bool,
    shared: Arc<Mutex<EngineShared>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            supported: true,
            shared: Arc::default(),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            shared: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    /// Deliver an event from the most recently created engine
    pub fn emit(&self, event: EngineEvent) {
        let mut shared = self.shared.lock().unwrap();
        if let EngineEvent::ManifestParsed { levels } = &event {
            shared.levels = levels.clone();
        }
        let sender = shared.sender.as_ref().expect("no engine created");
        sender.send(event).expect("session dropped its receiver");
    }
}

struct FakeEngine {
    shared: Arc<Mutex<EngineShared>>,
}

impl FakeEngine {
    fn record(&self, call: EngineCall) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

impl AdaptiveEngine for FakeEngine {
    fn load_source(&mut self, url: &Url, start_position: f64) {
        self.record(EngineCall::LoadSource(url.clone(), start_position));
    }

    fn start_load(&mut self, position: f64) {
        self.record(EngineCall::StartLoad(position));
    }

    fn recover_media_error(&mut self) {
        self.record(EngineCall::RecoverMediaError);
    }

    fn levels(&self) -> Vec<Variant> {
        self.shared.lock().unwrap().levels.clone()
    }

    fn current_level(&self) -> Option<usize> {
        self.shared.lock().unwrap().manual_level
    }

    fn set_current_level(&mut self, level: Option<usize>) {
        self.shared.lock().unwrap().manual_level = level;
        self.record(EngineCall::SetLevel(level));
    }

    fn auto_level_enabled(&self) -> bool {
        self.shared.lock().unwrap().manual_level.is_none()
    }

    fn destroy(&mut self) {
        self.record(EngineCall::Destroy);
    }
}

impl EngineFactory for FakeFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _sink: Arc<dyn RenderSink>, events: EngineEventSender) -> Box<dyn AdaptiveEngine> {
        self.shared.lock().unwrap().sender = Some(events);
        Box::new(FakeEngine {
            shared: self.shared.clone(),
        })
    }
}

// =============================================================================
// Backend and navigation
// =============================================================================

pub struct FakeApi {
    pub views: AtomicUsize,
    pub videos: Mutex<HashMap<StreamId, VideoMetadata>>,
    /// While set, `increment_view` waits for `release_views`
    pub hold_views: AtomicBool,
    release: Notify,
    origin: Url,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            views: AtomicUsize::new(0),
            videos: Mutex::default(),
            hold_views: AtomicBool::new(false),
            release: Notify::new(),
            origin: Url::parse("http://localhost:8080/").unwrap(),
        }
    }
}

impl FakeApi {
    pub fn views(&self) -> usize {
        self.views.load(Ordering::SeqCst)
    }

    pub fn release_views(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl VideoApi for FakeApi {
    async fn get_video(&self, id: &StreamId) -> Result<VideoMetadata> {
        self.videos.lock().unwrap().get(id).cloned().ok_or(Error::Api {
            status: 404,
            endpoint: format!("/videos/{}", id),
        })
    }

    async fn increment_view(&self, _id: &StreamId) -> Result<()> {
        if self.hold_views.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.views.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn like(&self, _id: &StreamId) -> Result<LikeResponse> {
        Ok(LikeResponse { liked: true, likes: Some(1) })
    }

    async fn unlike(&self, _id: &StreamId) -> Result<LikeResponse> {
        Ok(LikeResponse { liked: false, likes: Some(0) })
    }

    async fn like_status(&self, _id: &StreamId) -> Result<LikeStatus> {
        Ok(LikeStatus { liked: false })
    }

    fn media_base(&self) -> &Url {
        &self.origin
    }
}

#[derive(Default)]
pub struct FakeNavigator {
    pub routes: Mutex<Vec<PlayerRoute>>,
}

impl FakeNavigator {
    pub fn last(&self) -> Option<PlayerRoute> {
        self.routes.lock().unwrap().last().cloned()
    }
}

impl Navigator for FakeNavigator {
    fn navigate(&self, route: &PlayerRoute) {
        self.routes.lock().unwrap().push(route.clone());
    }
}

// =============================================================================
// In-memory manifest loader
// =============================================================================

/// Serves playlists and segments from memory; unknown URLs fail like a network error
#[derive(Default)]
pub struct MemoryLoader {
    pub documents: HashMap<String, String>,
    pub segment_size: usize,
    pub requests: Mutex<Vec<String>>,
}

impl MemoryLoader {
    /// Master with three levels and a six-segment VOD playlist per level
    pub fn vod(base: &str) -> Self {
        let mut documents = HashMap::new();
        documents.insert(
            format!("{}/master.m3u8", base),
            "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
1080p/index.m3u8
"
            .to_string(),
        );

        let mut media = String::from("#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n");
        for i in 0..6 {
            media.push_str(&format!("#EXTINF:4.0,\nseg{}.ts\n", i));
        }
        media.push_str("#EXT-X-ENDLIST\n");

        for quality in ["360p", "720p", "1080p"] {
            documents.insert(format!("{}/{}/index.m3u8", base, quality), media.clone());
        }

        Self {
            documents,
            segment_size: 1024,
            requests: Mutex::default(),
        }
    }

    fn fetch(&self, url: &Url) -> Result<&String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.documents
            .get(url.as_str())
            .ok_or_else(|| Error::ManifestFetch(format!("404 for {}", url)))
    }
}

#[async_trait]
impl ManifestLoader for MemoryLoader {
    async fn load_manifest(&self, url: &Url) -> Result<Manifest> {
        parse_manifest(self.fetch(url)?, url)
    }

    async fn load_media_playlist(&self, url: &Url) -> Result<MediaPlaylist> {
        parse_media_playlist(self.fetch(url)?, url)
    }

    async fn load_segment(&self, url: &Url) -> Result<Bytes> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(Bytes::from(vec![0u8; self.segment_size]))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn stream_url(id: u64) -> Url {
    Url::parse(&format!("http://localhost:8080/hls/{}/master.m3u8", id)).unwrap()
}

pub fn variant(index: usize, height: Option<u32>, bandwidth: u64) -> Variant {
    Variant {
        index,
        bandwidth,
        resolution: height.map(|h| Resolution::new(h * 16 / 9, h)),
        codecs: None,
        uri: Url::parse(&format!("http://localhost:8080/hls/v/{}/index.m3u8", index)).unwrap(),
    }
}

/// Four levels in manifest order: 480p, 1080p, 720p, unknown
pub fn levels() -> Vec<Variant> {
    vec![
        variant(0, Some(480), 1_200_000),
        variant(1, Some(1080), 5_000_000),
        variant(2, Some(720), 2_800_000),
        variant(3, None, 600_000),
    ]
}

/// Let spawned tasks (view counting) run to completion
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn ready_video(id: u64) -> VideoMetadata {
    VideoMetadata {
        id: StreamId::from(id),
        title: format!("Video {}", id),
        description: None,
        uploader_name: None,
        // Backend paths are origin-relative
        hls_url: Some(format!("/hls/{}/master.m3u8", id)),
        thumbnail_url: None,
        status: Some(VideoStatus::Ready),
        qualities: None,
        duration: Some(600),
        views: Some(0),
        likes: Some(0),
    }
}
