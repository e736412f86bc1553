//! Integration tests for the HLS engine driving a media session

mod common;

use common::*;
use localtube_core::error::StreamErrorKind;
use localtube_core::{
    EngineFactory, HlsEngineFactory, MediaSession, PlaybackMode, PlayerConfig, SessionEvent, SinkSlot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

const BASE: &str = "http://localhost:8080/hls/abc";

fn master() -> Url {
    Url::parse(&format!("{}/master.m3u8", BASE)).unwrap()
}

fn config() -> PlayerConfig {
    PlayerConfig {
        retry_attempts: 1,
        retry_delay_ms: 10,
        // Keeps automatic selection on the 360p level
        max_bitrate: 1_000_000,
        ..PlayerConfig::default()
    }
}

async fn next(session: &mut MediaSession) -> SessionEvent {
    timeout(Duration::from_secs(5), session.next_event())
        .await
        .expect("timed out waiting for a session event")
        .expect("session stopped producing events")
}

#[test]
fn test_factory_is_supported() {
    let factory = HlsEngineFactory::new(PlayerConfig::default()).unwrap();
    assert!(factory.is_supported());
}

#[tokio::test]
async fn test_manifest_parsed_then_segments_appended() {
    let loader = Arc::new(MemoryLoader::vod(BASE));
    let factory = HlsEngineFactory::with_loader(loader.clone(), config());
    let sink = Arc::new(FakeSink::new("video"));
    let mut session = MediaSession::open(SinkSlot::new(sink.clone()), &factory, &master(), 0.0, false).unwrap();
    assert_eq!(session.mode(), PlaybackMode::Adaptive);

    let SessionEvent::Ready { renditions } = next(&mut session).await else {
        panic!("expected Ready first");
    };
    let heights: Vec<_> = renditions.iter().map(|v| v.resolution.map(|r| r.height)).collect();
    assert_eq!(heights, vec![Some(360), Some(720), Some(1080)]);

    assert_eq!(next(&mut session).await, SessionEvent::LevelSwitched { level: 0 });
    assert!(!sink.appended().is_empty());
    assert_eq!(session.current_level(), Some(0));
    assert!(session.auto_level_enabled());

    session.close();
}

#[tokio::test]
async fn test_pinned_level_is_loaded() {
    let loader = Arc::new(MemoryLoader::vod(BASE));
    let factory = HlsEngineFactory::with_loader(loader.clone(), config());
    let sink = Arc::new(FakeSink::new("video"));
    let mut session = MediaSession::open(SinkSlot::new(sink.clone()), &factory, &master(), 0.0, false).unwrap();

    assert!(matches!(next(&mut session).await, SessionEvent::Ready { .. }));
    assert!(matches!(next(&mut session).await, SessionEvent::LevelSwitched { .. }));

    session.set_level(Some(2)).unwrap();
    assert!(!session.auto_level_enabled());

    assert_eq!(next(&mut session).await, SessionEvent::LevelSwitched { level: 2 });
    assert!(sink.appended().iter().any(|(level, _)| *level == 2));
    assert!(loader
        .requests
        .lock()
        .unwrap()
        .iter()
        .any(|url| url.as_str() == format!("{}/1080p/seg0.ts", BASE)));
}

#[tokio::test]
async fn test_manifest_failure_restarts_load() {
    let loader = Arc::new(MemoryLoader::default());
    let factory = HlsEngineFactory::with_loader(loader, config());
    let sink = Arc::new(FakeSink::new("video"));
    let mut session = MediaSession::open(SinkSlot::new(sink), &factory, &master(), 0.0, false).unwrap();

    assert_eq!(
        next(&mut session).await,
        SessionEvent::Recovering {
            kind: StreamErrorKind::Network
        }
    );
    session.close();
}

#[tokio::test]
async fn test_rejected_media_recovers_then_gives_up() {
    let loader = Arc::new(MemoryLoader::vod(BASE));
    let factory = HlsEngineFactory::with_loader(loader, config());
    let mut sink = FakeSink::new("video");
    sink.reject_appends = true;
    let sink = Arc::new(sink);
    let slot = SinkSlot::new(sink.clone());
    let mut session = MediaSession::open(slot.clone(), &factory, &master(), 0.0, false).unwrap();

    assert!(matches!(next(&mut session).await, SessionEvent::Ready { .. }));
    assert_eq!(
        next(&mut session).await,
        SessionEvent::Recovering {
            kind: StreamErrorKind::Media
        }
    );
    assert!(matches!(next(&mut session).await, SessionEvent::Unavailable { .. }));
    assert!(sink.state.lock().unwrap().resets >= 1);
    assert!(!slot.is_attached());
}
