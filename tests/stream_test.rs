//! Integration tests for the stream route.

mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_bytes, body_to_string, pattern, TestHarness, VOLUME};
use reelhouse_media::{Entry, ResourceMode, VolumeId};

fn ranged(uri: &str, range: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_full_file() {
    for mode in [ResourceMode::Direct, ResourceMode::Buffered] {
        let h = TestHarness::with_options(mode, 2);
        let content = pattern(100_000);
        h.add_file("Action/movie.mp4", &content);
        h.rescan();
        let id = h.id_of("movie");

        let response = h.get(&format!("/stream/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "video/mp4");
        assert_eq!(headers.get(header::ACCEPT_RANGES).unwrap(), "bytes");
        assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "100000");
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"movie.mp4\""
        );
        assert!(headers.get(header::LAST_MODIFIED).is_some());
        assert!(headers.get(header::CONTENT_RANGE).is_none());

        assert_eq!(body_bytes(response.into_body()).await, content);
    }
}

#[tokio::test]
async fn test_range_requests() {
    for mode in [ResourceMode::Direct, ResourceMode::Buffered] {
        let h = TestHarness::with_options(mode, 2);
        let content = pattern(2048);
        h.add_file("clip.mp4", &content);
        h.rescan();
        let uri = format!("/stream/{}", h.id_of("clip"));

        let response = h.send(ranged(&uri, "bytes=100-199")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 100-199/2048"
        );
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "100");
        assert_eq!(body_bytes(response.into_body()).await, &content[100..200]);

        let response = h.send(ranged(&uri, "bytes=2000-")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_bytes(response.into_body()).await, &content[2000..]);

        let response = h.send(ranged(&uri, "bytes=-48")).await;
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 2000-2047/2048"
        );
        assert_eq!(body_bytes(response.into_body()).await, &content[2000..]);
    }
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let h = TestHarness::new();
    h.add_file("clip.mp4", &pattern(10));
    h.rescan();
    let uri = format!("/stream/{}", h.id_of("clip"));

    let response = h.send(ranged(&uri, "bytes=50-")).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers().get(header::CONTENT_RANGE).unwrap(), "bytes */10");

    // The slot must have been returned
    let mount = h.ctx.manager.mount(&VolumeId::new(VOLUME)).unwrap();
    assert_eq!(mount.limiter().available(), 2);
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let h = TestHarness::new();
    h.add_file("clip.mp4", &pattern(512));
    h.rescan();
    let uri = format!("/stream/{}", h.id_of("clip"));

    let response = h
        .send(
            Request::builder()
                .method(Method::HEAD)
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "512");
    assert!(body_bytes(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_dlna_headers_only_for_renderers() {
    let h = TestHarness::new();
    h.add_file("clip.mp4", &pattern(16));
    h.rescan();
    let uri = format!("/stream/{}", h.id_of("clip"));

    let response = h
        .send(
            Request::get(&uri)
                .header(header::USER_AGENT, "Kodi/20.2 (Linux)")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.headers().get("transferMode.dlna.org").unwrap(), "Streaming");
    assert!(response
        .headers()
        .get("contentFeatures.dlna.org")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("DLNA.ORG_OP=01"));
    assert_eq!(
        response.headers().get("realTimeInfo.dlna.org").unwrap(),
        "DLNA.ORG_TLAG=*"
    );

    let response = h
        .send(
            Request::get(&uri)
                .header(header::USER_AGENT, "Mozilla/5.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(response.headers().get("transferMode.dlna.org").is_none());
}

#[tokio::test]
async fn test_bad_and_unknown_ids_are_404() {
    let h = TestHarness::new();

    let response = h.get("/stream/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h
        .get("/stream/0190f2c4-7b1e-7c3a-9d2b-1a2b3c4d5e6f")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_traversal_entry_is_forbidden() {
    let h = TestHarness::new();
    let outside = h.root().parent().unwrap().join("reelhouse-secret.mp4");
    std::fs::write(&outside, b"secret").unwrap();

    let entry = Entry::new(VolumeId::new(VOLUME), "../reelhouse-secret.mp4".into(), 6);
    let id = entry.id;
    h.ctx.manager.registry().add(entry);

    let response = h.get(&format!("/stream/{id}")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_to_string(response.into_body()).await;
    assert!(!body.contains("secret"));

    std::fs::remove_file(outside).unwrap();
}

#[tokio::test]
async fn test_missing_volume_is_503() {
    let h = TestHarness::new();
    let entry = Entry::new(VolumeId::new("unmounted"), "a.mp4".into(), 1);
    let id = entry.id;
    h.ctx.manager.registry().add(entry);

    let response = h.get(&format!("/stream/{id}")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_vanished_file_is_404() {
    let h = TestHarness::new();
    h.add_file("clip.mp4", b"abc");
    h.rescan();
    let id = h.id_of("clip");
    std::fs::remove_file(h.root().join("clip.mp4")).unwrap();

    let response = h.get(&format!("/stream/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_busy_volume_returns_503_after_admission_timeout() {
    let h = TestHarness::with_options(ResourceMode::Direct, 1);
    h.add_file("clip.mp4", b"abc");
    h.rescan();
    let id = h.id_of("clip");

    let mount = h.ctx.manager.mount(&VolumeId::new(VOLUME)).unwrap();
    let held = mount.limiter().try_acquire().unwrap();

    let response = h.get(&format!("/stream/{id}")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["error"], "server too busy");

    drop(held);
    let response = h.get(&format!("/stream/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_shutdown_releases_waiting_requests() {
    let h = TestHarness::with_options(ResourceMode::Direct, 1);
    h.add_file("clip.mp4", b"abc");
    h.rescan();
    let id = h.id_of("clip");

    let mount = h.ctx.manager.mount(&VolumeId::new(VOLUME)).unwrap();
    let _held = mount.limiter().try_acquire().unwrap();

    let router = h.router();
    let pending = tokio::spawn(async move {
        use tower::ServiceExt;
        router
            .oneshot(
                Request::get(format!("/stream/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.ctx.shutdown.cancel();

    let status = tokio::time::timeout(Duration::from_millis(500), pending)
        .await
        .expect("cancelled request should finish promptly")
        .unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_slot_is_released_after_body_completes() {
    let h = TestHarness::with_options(ResourceMode::Buffered, 1);
    h.add_file("clip.mp4", &pattern(300_000));
    h.rescan();
    let uri = format!("/stream/{}", h.id_of("clip"));
    let mount = h.ctx.manager.mount(&VolumeId::new(VOLUME)).unwrap();

    for _ in 0..3 {
        let response = h.get(&uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response.into_body()).await.len(), 300_000);

        // The reader gives the slot back right after sending its last chunk
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while mount.limiter().available() != 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(mount.limiter().available(), 1);
    }
}

#[tokio::test]
async fn test_dropped_body_releases_slot() {
    let h = TestHarness::with_options(ResourceMode::Direct, 1);
    h.add_file("big.mp4", &pattern(4 * 1024 * 1024));
    h.rescan();
    let uri = format!("/stream/{}", h.id_of("big"));
    let mount = h.ctx.manager.mount(&VolumeId::new(VOLUME)).unwrap();

    let response = h.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mount.limiter().available(), 0);
    drop(response);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while mount.limiter().available() != 1 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(mount.limiter().available(), 1);
}

#[tokio::test]
async fn test_range_over_real_connection() {
    let (h, addr) = TestHarness::new().with_server().await;
    let content = pattern(50_000);
    h.add_file("Clips/clip.mp4", &content);
    h.rescan();
    let id = h.id_of("clip");

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/stream/{id}"))
        .header("Range", "bytes=1000-1999")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get("content-range").unwrap().to_str().unwrap(),
        "bytes 1000-1999/50000"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &content[1000..2000]);

    let playlist = reqwest::get(format!("http://{addr}/playlist.m3u"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(playlist.contains(&format!("http://{addr}/stream/{id}")));
}
