//! HTTP tests driving the router with a synthetic camera

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use api::{create_router, AppState, RateLimitConfig};
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use camera_capture::{CameraBackend, CameraConfig, CameraDevice, CameraError, VideoFrame};
use detection::{DetectionService, DetectionSettings, StreamConfig};
use fatigue::DisabledLandmarks;
use serde_json::Value;
use tokio_stream::StreamExt;
use tower::ServiceExt;

struct SyntheticBackend {
    available: bool,
    read_delay: Duration,
}

impl CameraBackend for SyntheticBackend {
    fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError> {
        if !self.available {
            return Err(CameraError::Unavailable(config.device.clone()));
        }
        Ok(Box::new(SyntheticCamera {
            sequence: 0,
            read_delay: self.read_delay,
        }))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

struct SyntheticCamera {
    sequence: u32,
    read_delay: Duration,
}

impl CameraDevice for SyntheticCamera {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.sequence += 1;
        std::thread::sleep(self.read_delay);
        Ok(VideoFrame::filled(32, 24, [100, 120, 140], self.sequence))
    }
}

fn service(available: bool) -> DetectionService {
    service_with(SyntheticBackend {
        available,
        read_delay: Duration::from_millis(2),
    })
}

fn service_with(backend: SyntheticBackend) -> DetectionService {
    let settings = DetectionSettings {
        stream: StreamConfig {
            idle_poll_ms: 5,
            channel_capacity: 2,
        },
        ..Default::default()
    };
    DetectionService::new(
        settings,
        Arc::new(backend),
        Arc::new(DisabledLandmarks),
    )
    .unwrap()
}

fn app_with(service: DetectionService, rate_limit: RateLimitConfig) -> Router {
    let state = Arc::new(AppState::new(service, 5003));
    create_router(state, &rate_limit).unwrap()
}

fn app(service: DetectionService) -> Router {
    app_with(service, RateLimitConfig::default())
}

fn request(method: Method, uri: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    req
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_banner() {
    let response = app(service(true)).oneshot(request(Method::GET, "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["port"], 5003);
    assert!(body["status"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_status_before_start() {
    let response = app(service(true))
        .oneshot(request(Method::GET, "/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["fatigue_status"], "Normal");
    assert_eq!(
        body["recommendation"],
        "Recommendation: Start detection to monitor eye fatigue."
    );
    assert_eq!(body["camera_active"], false);
    assert_eq!(body["blink_count"], 0);
    assert!(body.get("fatigue_probability").is_none());
}

#[tokio::test]
async fn test_start_and_stop() {
    let svc = service(true);
    let app = app(svc.clone());

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/start_detection"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "started");
    assert!(svc.is_active());

    // second start is a no-op
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/start_detection"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(app.clone().oneshot(request(Method::GET, "/status")).await.unwrap()).await;
    assert_eq!(body["camera_active"], true);

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/stop_detection"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "stopped");
    assert!(!svc.is_active());
}

#[tokio::test]
async fn test_start_without_camera() {
    let response = app(service(false))
        .oneshot(request(Method::POST, "/start_detection"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("Device unavailable"));
}

#[tokio::test]
async fn test_snapshot_missing_before_frames() {
    let response = app(service(true))
        .oneshot(request(Method::GET, "/snapshot"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_video_feed_streams_multipart_jpeg() {
    let svc = service(true);
    svc.start().unwrap();
    let app = app(svc.clone());

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/video_feed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );

    let mut chunks = response.into_body().into_data_stream();
    let chunk = chunks.next().await.unwrap().unwrap();
    let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    assert!(chunk.starts_with(header));
    assert_eq!(&chunk[header.len()..header.len() + 2], &[0xFF, 0xD8]);
    drop(chunks);

    let response = app.oneshot(request(Method::GET, "/snapshot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    svc.stop();
}

#[tokio::test]
async fn test_video_feed_ends_on_stop() {
    let svc = service(true);
    svc.start().unwrap();

    let response = app(svc.clone())
        .oneshot(request(Method::GET, "/video_feed"))
        .await
        .unwrap();
    let mut chunks = response.into_body().into_data_stream();
    assert!(chunks.next().await.is_some());

    let stopper = svc.clone();
    tokio::task::spawn_blocking(move || stopper.stop()).await.unwrap();

    // drain buffered frames; the stream must then terminate
    let mut remaining = 0;
    while chunks.next().await.is_some() {
        remaining += 1;
        assert!(remaining < 10);
    }
}

#[tokio::test]
async fn test_health() {
    let response = app(service(true))
        .oneshot(request(Method::GET, "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["camera"]["status"], "idle");
}

#[tokio::test]
async fn test_metrics_without_exporter() {
    let response = app(service(true))
        .oneshot(request(Method::GET, "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_control_is_rate_limited() {
    let app = app_with(
        service(true),
        RateLimitConfig {
            per_second: 60,
            burst_size: 2,
        },
    );

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/stop_detection"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/stop_detection"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // status is not limited
    let response = app.oneshot(request(Method::GET, "/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_does_not_stall_runtime_during_slow_reads() {
    let svc = service_with(SyntheticBackend {
        available: true,
        read_delay: Duration::from_millis(300),
    });
    svc.start().unwrap();
    let app = app(svc.clone());

    // keep a stream reading so the session lock is held across camera reads
    let mut rx = svc.spawn_stream().unwrap();
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let max_gap_ms = Arc::new(AtomicU64::new(0));
    let ticker = {
        let max_gap_ms = max_gap_ms.clone();
        tokio::spawn(async move {
            let mut last = Instant::now();
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let now = Instant::now();
                let gap = now.duration_since(last).as_millis() as u64;
                max_gap_ms.fetch_max(gap, Ordering::SeqCst);
                last = now;
            }
        })
    };

    for uri in ["/status", "/health", "/snapshot", "/status"] {
        let response = app.clone().oneshot(request(Method::GET, uri)).await.unwrap();
        assert_ne!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    ticker.abort();
    let stopper = svc.clone();
    tokio::task::spawn_blocking(move || stopper.stop()).await.unwrap();
    drain.await.unwrap();

    let max_gap = max_gap_ms.load(Ordering::SeqCst);
    assert!(max_gap < 150, "runtime stalled for {} ms", max_gap);
}
