use std::time::Duration;

use bytes::Bytes;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};
use edgecast::{
    BroadcastFile, CacheSettings, DeliveryProtocol, Gateway, GatewaySettings, HttpClient,
    StreamSettings,
};

use crate::{init_tracing, media_playlist};

fn gateway() -> Gateway {
    Gateway::new(
        GatewaySettings {
            cache: CacheSettings {
                ttl: Duration::from_secs(5),
                ..Default::default()
            },
            stream: StreamSettings {
                cdn_fallback: false,
                pending_file_ttl: Duration::from_secs(10),
                ..Default::default()
            },
            ..Default::default()
        },
        HttpClient::default(),
    )
}

fn segment(location: &str) -> BroadcastFile {
    BroadcastFile::new(location, 1, "video/mp2t", Bytes::from_static(b"ts"))
}

#[tokio::test]
async fn deliver_routes_by_longest_directory() -> anyhow::Result<()> {
    let gateway = gateway();
    gateway.add_stream(
        "ch1",
        "http://cdn.invalid/live/ch1/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;
    gateway.add_stream(
        "ch1-hd",
        "http://cdn.invalid/live/ch1/hd/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;

    assert!(gateway.deliver(segment("live/ch1/hd/seg_1.ts"))?);
    assert!(gateway.deliver(segment("live/ch1/seg_1.ts"))?);
    assert!(gateway.deliver(segment("live/ch1/seg_2.ts"))?);
    assert!(!gateway.deliver(segment("live/ch2/seg_1.ts"))?);

    let status = gateway.status();
    assert_eq!(status.streams["ch1"].pending_files, 2);
    assert_eq!(status.streams["ch1-hd"].pending_files, 1);

    assert!(gateway.deliver(BroadcastFile::new(
        "live/ch1/index.m3u8",
        2,
        "application/vnd.apple.mpegurl",
        media_playlist(1, 2, 6),
    ))?);
    let status = gateway.status();
    assert_eq!(status.streams["ch1"].window, vec![1, 2]);
    assert_eq!(status.streams["ch1"].pending_files, 0);
    assert_eq!(
        status.streams["ch1"].playlist_path.as_deref(),
        Some("live/ch1/index.m3u8")
    );
    assert!(status.streams["ch1-hd"].window.is_empty());

    let playlist = gateway.cache().get("live/ch1/index.m3u8").unwrap();
    assert!(!playlist.read().await?.is_empty());
    assert_eq!(
        gateway.cache().get("live/ch1/seg_2.ts").unwrap().read().await?,
        "ts"
    );

    Ok(())
}

#[tokio::test]
async fn dash_stream_is_routed() -> anyhow::Result<()> {
    let gateway = gateway();
    let stream = gateway.add_stream(
        "dash",
        "http://cdn.invalid/dash/ch1/manifest.mpd",
        DeliveryProtocol::Dash,
        0,
    )?;
    assert_eq!(stream.protocol(), DeliveryProtocol::Dash);

    assert!(gateway.deliver(BroadcastFile::new(
        "dash/ch1/init-v0.mp4",
        1,
        "video/mp4",
        Bytes::from_static(b"init"),
    ))?);
    assert!(gateway.cache().contains("dash/ch1/init-v0.mp4"));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn started_gateway_sweeps_and_ages_pending_files() -> anyhow::Result<()> {
    let gateway = gateway();
    gateway.add_stream(
        "ch1",
        "http://cdn.invalid/live/ch1/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;
    gateway.start();
    // streams added later get their own tick
    gateway.add_stream(
        "ch2",
        "http://cdn.invalid/live/ch2/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;

    gateway.deliver(segment("live/ch1/seg_9.ts"))?;
    gateway.deliver(segment("live/ch2/seg_9.ts"))?;
    gateway.deliver(BroadcastFile::new(
        "live/ch1/index.m3u8",
        2,
        "application/vnd.apple.mpegurl",
        media_playlist(1, 2, 6),
    ))?;
    assert!(gateway.cache().contains("live/ch1/seg_1.ts"));

    tokio::time::sleep(Duration::from_secs(12)).await;

    let status = gateway.status();
    assert_eq!(status.streams["ch1"].pending_files, 0);
    assert_eq!(status.streams["ch2"].pending_files, 0);
    // nothing was merged since, so the cache aged out
    assert!(!gateway.cache().contains("live/ch1/seg_1.ts"));
    assert!(!gateway.cache().contains("live/ch1/index.m3u8"));
    assert_eq!(status.cache_items, 0);

    gateway.shutdown();
    Ok(())
}

#[tokio::test]
async fn replaced_stream_leaves_nothing_behind() -> anyhow::Result<()> {
    let gateway = gateway();
    gateway.add_stream(
        "ch1",
        "http://cdn.invalid/live/ch1/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;
    gateway.deliver(BroadcastFile::new(
        "live/ch1/index.m3u8",
        1,
        "application/vnd.apple.mpegurl",
        media_playlist(1, 2, 6),
    ))?;
    assert!(gateway.cache().contains("live/ch1/seg_1.ts"));

    gateway.add_stream(
        "ch1",
        "http://cdn.invalid/live/ch1b/index.m3u8",
        DeliveryProtocol::Hls,
        0,
    )?;
    assert!(!gateway.cache().contains("live/ch1/seg_1.ts"));
    assert!(!gateway.cache().contains("live/ch1/index.m3u8"));
    assert!(gateway.cache().contains("live/ch1b/index.m3u8"));
    assert!(!gateway.deliver(segment("live/ch1/seg_3.ts"))?);

    // a bad endpoint keeps the registered stream
    assert!(gateway
        .add_stream("ch1", "not a url", DeliveryProtocol::Hls, 0)
        .is_err());
    assert!(gateway.stream("ch1").is_some());

    assert!(gateway.remove_stream("ch1"));
    assert!(!gateway.remove_stream("ch1"));
    assert!(gateway.status().streams.is_empty());
    assert!(gateway.cache().is_empty());

    Ok(())
}

async fn origin(segment_prefix: &str) -> MockServer {
    let server = MockServer::start().await;
    let playlist = media_playlist(1, 3, 6).replace("seg_", segment_prefix);
    Mock::given(method("GET"))
        .and(path("/live/ch1/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(playlist))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn replaced_stream_stops_polling_its_origin() -> anyhow::Result<()> {
    init_tracing();
    let old_origin = origin("old_").await;
    let new_origin = origin("new_").await;

    let gateway = Gateway::new(
        GatewaySettings {
            stream: StreamSettings {
                cdn_fallback: true,
                truncate_cdn_playlist_segments: 0,
                ..Default::default()
            },
            tick_interval: Duration::from_millis(20),
            ..Default::default()
        },
        HttpClient::default(),
    );
    gateway.add_stream(
        "ch1",
        &format!("{}/live/ch1/index.m3u8", old_origin.uri()),
        DeliveryProtocol::Hls,
        0,
    )?;
    gateway.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!old_origin.received_requests().await.unwrap().is_empty());

    gateway.add_stream(
        "ch1",
        &format!("{}/live/ch1/index.m3u8", new_origin.uri()),
        DeliveryProtocol::Hls,
        0,
    )?;
    // let a tick that was already in flight settle
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polled = old_origin.received_requests().await.unwrap().len();

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let playlist = gateway.cache().get("live/ch1/index.m3u8").unwrap();
        let playlist = playlist.read().await?;
        let playlist = std::str::from_utf8(&playlist)?;
        assert!(!playlist.contains("old_"), "{playlist}");
    }
    assert_eq!(old_origin.received_requests().await.unwrap().len(), polled);
    assert!(!new_origin.received_requests().await.unwrap().is_empty());
    assert_eq!(gateway.status().streams["ch1"].window, vec![1, 2, 3]);

    gateway.shutdown();
    Ok(())
}
