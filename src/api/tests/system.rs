use super::*;
use crate::types::{Event, JobId};
use futures::StreamExt;

#[tokio::test]
async fn test_root_banner() {
    let (app, _downloader, _temp_dir) = test_app();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "VidVault API is running");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _downloader, _temp_dir) = test_app();

    let response = get(&app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["fetcher"], "scripted");
    assert_eq!(json["accepting"], true);
}

#[tokio::test]
async fn test_health_reports_shutdown() {
    let (app, downloader, _temp_dir) = test_app();
    downloader.shutdown().await.unwrap();

    let json = body_json(get(&app, "/api/health").await).await;
    assert_eq!(json["accepting"], false);
}

#[tokio::test]
async fn test_openapi_json_endpoint() {
    let (app, _downloader, _temp_dir) = test_app();

    let response = get(&app, "/api/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["openapi"].as_str().unwrap().starts_with("3."));
    assert_eq!(json["info"]["title"], "vidvault REST API");
    assert!(json["paths"].get("/api/video/download").is_some());
}

#[tokio::test]
async fn test_swagger_ui_enabled() {
    let (downloader, _temp_dir) = create_test_downloader();

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(downloader, Arc::new(config));

    let response = get(&app, "/swagger-ui/").await;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Swagger UI should be accessible when enabled"
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("<html") || body.contains("<!DOCTYPE html>"));
}

#[tokio::test]
async fn test_swagger_ui_disabled() {
    let (downloader, _temp_dir) = create_test_downloader();

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));

    let response = get(&app, "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sse_event_stream() {
    let (app, downloader, _temp_dir) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/video/events")
                .header("Accept", "text/event-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(
        content_type.contains("text/event-stream"),
        "Content-Type should be text/event-stream, got: {content_type}"
    );

    // The handler subscribed before returning, so this event is delivered
    let id = JobId::new();
    downloader.emit_event(Event::Cancelled { id });

    let mut stream = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("SSE frame should arrive")
        .expect("stream should not end")
        .unwrap();
    let frame = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(frame.contains("event: cancelled"), "frame: {frame}");
    assert!(frame.contains(&id.to_string()), "frame: {frame}");
}

#[tokio::test]
async fn test_sse_streams_job_lifecycle() {
    let (app, downloader, _temp_dir) = test_app();

    let response = get(&app, "/api/video/events").await;
    let mut stream = response.into_body().into_data_stream();

    let id = downloader
        .submit("https://example.com/watch?v=1", Default::default())
        .await
        .unwrap();
    test_helpers::wait_for_terminal(&downloader, id).await;

    let mut names = Vec::new();
    while let Ok(Some(Ok(chunk))) =
        tokio::time::timeout(Duration::from_millis(200), stream.next()).await
    {
        let frame = String::from_utf8(chunk.to_vec()).unwrap();
        names.extend(
            frame
                .lines()
                .filter_map(|line| line.strip_prefix("event: "))
                .map(str::to_string),
        );
        if names.iter().any(|n| n == "finished") {
            break;
        }
    }

    assert_eq!(names.first().map(String::as_str), Some("queued"));
    assert!(names.iter().any(|n| n == "progress"), "events: {names:?}");
    assert!(names.iter().any(|n| n == "finished"), "events: {names:?}");
}
