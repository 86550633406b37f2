mod common;

use axum::body::Body;
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use common::*;

/// A stand-in for the processing backend.
async fn fake_backend() -> String {
    async fn transcribe(Json(body): Json<Value>) -> axum::response::Response {
        if body["recording_id"] == "html" {
            return (StatusCode::OK, "<html>maintenance</html>").into_response();
        }
        Json(json!({
            "transcript": "bonjour à tous",
            "language": body["language"],
            "received": body,
        }))
        .into_response()
    }

    async fn summarize(Json(body): Json<Value>) -> axum::response::Response {
        match body["recording_id"].as_str() {
            Some("missing") => (StatusCode::NOT_FOUND, "no transcript").into_response(),
            Some("busy") => (StatusCode::SERVICE_UNAVAILABLE, "model loading").into_response(),
            Some("teapot") => (StatusCode::IM_A_TEAPOT, "short and stout").into_response(),
            _ => Json(json!({
                "summary": "a short summary",
                "sentences": body["max_sentences"],
            }))
            .into_response(),
        }
    }

    async fn keywords(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "requested": body["max_keywords"] }))
    }

    async fn models() -> Json<Value> {
        Json(json!({
            "whisper": { "available": true, "model": "small" },
            "mistral": { "available": true },
        }))
    }

    async fn start(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "job_id": "job-1", "received": body, "message": "backend says hi" }))
    }

    async fn check(Json(body): Json<Value>) -> axum::response::Response {
        if body["url"] == "http://dead.example/stream" {
            return (StatusCode::BAD_GATEWAY, "stream offline").into_response();
        }
        Json(json!({ "url": body["url"], "available": true, "bitrate": 128 })).into_response()
    }

    async fn process(Path(id): Path<String>) -> Json<Value> {
        Json(json!({ "recording_id": id, "transcript": "t", "summary": "s" }))
    }

    async fn remove(Path(id): Path<String>) -> StatusCode {
        if id == "404" {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::NO_CONTENT
        }
    }

    let router = Router::new()
        .route("/api/ai/transcribe/", post(transcribe))
        .route("/api/ai/summarize/", post(summarize))
        .route("/api/ai/extract-keywords/", post(keywords))
        .route("/api/ai/models-info/", get(models))
        .route("/api/recordings/jobs/start/", post(start))
        .route("/api/recordings/check-stream/", post(check))
        .route("/api/archive/recordings/{id}/process/", post(process))
        .route("/api/archive/recordings/{id}/", delete(remove));
    spawn_backend(router).await
}

async fn app() -> Router {
    router_with(memory_store(), backend_at(&fake_backend().await))
}

fn offline() -> Router {
    router_with(memory_store(), unreachable_backend())
}

#[tokio::test]
async fn transcribe_defaults_language_and_reshapes_answer() {
    let res = send(
        app().await,
        json_request("POST", "/api/ai/transcribe", json!({ "recording_id": 12 })),
    )
    .await;
    assert_eq!(res.status().as_u16(), 200);

    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["transcript"], "bonjour à tous");
    assert_eq!(body["language"], "fr");
    assert!(body["message"].is_string());
    assert!(body.get("received").is_none());
}

#[tokio::test]
async fn missing_recording_id_is_rejected_before_forwarding() {
    for uri in ["/api/ai/transcribe", "/api/ai/summarize", "/api/ai/extract-keywords", "/api/archive/process"] {
        let res = send(offline(), json_request("POST", uri, json!({ "language": "en" }))).await;
        assert_eq!(res.status().as_u16(), 400, "{uri}");
        let body = json_body(res).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("recording_id"));
    }

    let res = send(offline(), json_request("DELETE", "/api/archive/delete", json!({}))).await;
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn unreachable_backend_is_503_everywhere() {
    let posts = [
        ("/api/ai/transcribe", json!({ "recording_id": "1" })),
        ("/api/ai/summarize", json!({ "recording_id": "1" })),
        ("/api/ai/extract-keywords", json!({ "recording_id": "1" })),
        ("/api/archive/process", json!({ "recording_id": "1" })),
        ("/api/recordings/start", json!({ "source": "http://radio/stream", "title": "t" })),
    ];
    for (uri, payload) in posts {
        let res = send(offline(), json_request("POST", uri, payload)).await;
        assert_eq!(res.status().as_u16(), 503, "{uri}");
        let body = json_body(res).await;
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["message"].is_string());
        assert_eq!(body["error"], "backend unreachable");
    }

    let res = send(offline(), json_request("DELETE", "/api/archive/delete", json!({ "recording_id": "1" }))).await;
    assert_eq!(res.status().as_u16(), 503);
}

#[tokio::test]
async fn summarize_special_cases() {
    let res = send(app().await, json_request("POST", "/api/ai/summarize", json!({ "recording_id": "missing" }))).await;
    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body.get("error").is_none());

    let res = send(app().await, json_request("POST", "/api/ai/summarize", json!({ "recording_id": "busy" }))).await;
    assert_eq!(res.status().as_u16(), 503);
    let body = json_body(res).await;
    assert_eq!(body["error"], "model loading");
    assert!(body["message"].as_str().unwrap().contains("temporarily unavailable"));

    let res = send(app().await, json_request("POST", "/api/ai/summarize", json!({ "recording_id": "7" }))).await;
    let body = json_body(res).await;
    assert_eq!(body["summary"], "a short summary");
    assert!(body.get("sentences").is_none());
}

#[tokio::test]
async fn other_backend_statuses_pass_through_with_raw_body() {
    let res = send(app().await, json_request("POST", "/api/ai/summarize", json!({ "recording_id": "teapot" }))).await;
    assert_eq!(res.status().as_u16(), 418);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "short and stout");
    assert!(body["message"].as_str().unwrap().contains("418"));
}

#[tokio::test]
async fn non_json_success_body_is_internal_error() {
    let res = send(app().await, json_request("POST", "/api/ai/transcribe", json!({ "recording_id": "html" }))).await;
    assert_eq!(res.status().as_u16(), 500);
    assert_eq!(json_body(res).await["success"], false);
}

#[tokio::test]
async fn keywords_default_to_empty_list() {
    let res = send(
        app().await,
        json_request("POST", "/api/ai/extract-keywords", json!({ "recording_id": "3" })),
    )
    .await;
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["keywords"], json!([]));
}

#[tokio::test]
async fn models_info_merges_or_reports_stubs() {
    let req = || Request::builder().uri("/api/ai/models-info").body(Body::empty()).unwrap();

    let body = json_body(send(app().await, req()).await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["whisper"]["model"], "small");

    let res = send(offline(), req()).await;
    assert_eq!(res.status().as_u16(), 503);
    let body = json_body(res).await;
    assert_eq!(body["whisper"]["available"], false);
    assert_eq!(body["mistral"]["available"], false);
}

#[tokio::test]
async fn start_recording_validates_and_fills_defaults() {
    let res = send(
        offline(),
        json_request("POST", "/api/recordings/start", json!({ "source": "http://radio/stream" })),
    )
    .await;
    assert_eq!(res.status().as_u16(), 400);

    let res = send(
        app().await,
        json_request(
            "POST",
            "/api/recordings/start",
            json!({ "source": "http://radio/stream", "title": "Matin" }),
        ),
    )
    .await;
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["job_id"], "job-1");
    assert_eq!(body["received"]["format"], "mp3");
    assert_eq!(body["received"]["duration"], 30);
    assert!(body["message"].as_str().unwrap().contains("Matin"));
}

#[tokio::test]
async fn check_stream_uses_its_own_failure_shape() {
    let url = "http://dead.example/stream";
    let res = send(app().await, json_request("POST", "/api/recordings/check-stream", json!({ "url": url }))).await;
    assert_eq!(res.status().as_u16(), 502);
    let body = json_body(res).await;
    assert_eq!(body, json!({ "url": url, "available": false, "error": "stream offline" }));

    let res = send(offline(), json_request("POST", "/api/recordings/check-stream", json!({ "url": url }))).await;
    assert_eq!(res.status().as_u16(), 503);
    assert_eq!(json_body(res).await["available"], false);

    let res = send(
        app().await,
        json_request("POST", "/api/recordings/check-stream", json!({ "url": "http://live/stream" })),
    )
    .await;
    assert_eq!(json_body(res).await["bitrate"], 128);
}

#[tokio::test]
async fn archive_process_and_delete() {
    let res = send(app().await, json_request("POST", "/api/archive/process", json!({ "recording_id": 99 }))).await;
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["recording_id"], "99");
    assert!(body["message"].as_str().unwrap().contains("processed"));

    let res = send(app().await, json_request("DELETE", "/api/archive/delete", json!({ "recording_id": "5" }))).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["success"], true);

    let res = send(app().await, json_request("DELETE", "/api/archive/delete", json!({ "recording_id": "404" }))).await;
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/ai/transcribe")
        .header("content-type", "application/json")
        .body(Body::from("{\"recording_id\":"))
        .unwrap();
    let res = send(offline(), req).await;
    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await["code"], 400);
}

#[tokio::test]
async fn slow_backend_times_out_as_unavailable() {
    let router = router_with(memory_store(), impatient_backend(&slow_backend().await));

    let started = std::time::Instant::now();
    let res = send(router, json_request("POST", "/api/ai/transcribe", json!({ "recording_id": "1" }))).await;
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    assert_eq!(res.status().as_u16(), 503);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "backend unreachable");
    assert_eq!(body["code"], 503);
}
