mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use common::{
    body_bytes, body_json, build_test_app, build_test_app_with, get, poll_until_settled,
    post_json, post_multipart, uploaded_files, video, Field,
};
use serde_json::json;
use tower::ServiceExt;

const UPLOAD: &str = "/api/evaluations/upload";

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_user_then_duplicate_conflicts() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_json(&app, "/api/users", json!({"username": "alice", "password": "x"})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json, json!({"id": 1, "username": "alice"}));

    let response = post_json(&app, "/api/users", json!({"username": "alice", "password": "y"})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Username already taken");

    let stored = app
        .state
        .pool
        .get_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password, "x", "password must not be stored in plaintext");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_admit_one_user() {
    let app = build_test_app(Duration::from_secs(60));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::post("/api/users")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"username":"alice","password":"x"}"#))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!((created, conflicts), (1, 7), "statuses: {statuses:?}");

    assert!(app.state.pool.get_user(1).await.unwrap().is_some());
    assert!(app.state.pool.get_user(2).await.unwrap().is_none());
}

#[tokio::test]
async fn register_user_rejects_malformed_bodies() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_json(&app, "/api/users", json!({"username": "bob"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&app, "/api/users", json!({"username": "", "password": "x"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(&app, "/api/users", json!({"username": 5, "password": "x"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_evaluation_is_404() {
    let app = build_test_app(Duration::from_secs(60));

    let response = get(&app, "/api/evaluations/9999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn non_numeric_ids_are_400() {
    let app = build_test_app(Duration::from_secs(60));

    let response = get(&app, "/api/evaluations/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid evaluation ID");

    let response = get(&app, "/api/evaluations/user/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid user ID");
}

#[tokio::test]
async fn user_without_evaluations_gets_empty_list() {
    let app = build_test_app(Duration::from_secs(60));

    let response = get(&app, "/api/evaluations/user/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_creates_processing_evaluation_that_completes() {
    let app = build_test_app(Duration::from_millis(50));

    let response = post_multipart(
        &app,
        UPLOAD,
        &[Field::Text("title", "Demo"), video(b"fake mp4 bytes")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["status"], "processing");
    assert_eq!(created["title"], "Demo");
    assert_eq!(created["userId"], 1);
    assert!(created["overallScore"].is_null());
    assert!(created["feedback"].is_null());
    assert!(created["analysisDetails"].is_null());
    assert!(created["videoUrl"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/"));

    let id = created["id"].as_i64().unwrap();
    let settled = poll_until_settled(&app, id).await;
    assert_eq!(settled["status"], "completed");

    for field in [
        "overallScore",
        "confidenceScore",
        "facialExpressionsScore",
        "eyeContactScore",
        "bodyLanguageScore",
    ] {
        let score = settled[field].as_i64().unwrap();
        assert!((0..=100).contains(&score), "{field} = {score}");
    }
    assert!(!settled["feedback"].as_array().unwrap().is_empty());

    let distribution = settled["analysisDetails"]["expressionDistribution"]
        .as_object()
        .unwrap();
    assert_eq!(distribution.len(), 7);
    let total: i64 = distribution.values().map(|v| v.as_i64().unwrap()).sum();
    assert_eq!(total, 100);
    assert!(!settled["analysisDetails"]["timeline"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn uploaded_video_is_served_back() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_multipart(&app, UPLOAD, &[video(b"0123456789")]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["title"]
        .as_str()
        .unwrap()
        .starts_with("Evaluation "));

    let response = get(&app, created["videoUrl"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"0123456789");

    let response = get(&app, "/uploads/missing.mp4").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disallowed_mime_type_is_rejected_before_any_record() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_multipart(
        &app,
        UPLOAD,
        &[Field::File {
            name: "video",
            filename: "slide.png",
            content_type: "image/png",
            data: b"\x89PNG",
        }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid file type. Only MP4, WebM, and MOV videos are allowed."
    );

    assert!(app.state.pool.get_evaluation(1).await.unwrap().is_none());
    assert!(uploaded_files(&app).is_empty());
}

#[tokio::test]
async fn missing_video_field_is_rejected() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_multipart(&app, UPLOAD, &[Field::Text("title", "No file")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "No video file uploaded");
    assert!(app.state.pool.get_evaluation(1).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_user_id_discards_stored_video() {
    let app = build_test_app(Duration::from_secs(60));

    let response = post_multipart(
        &app,
        UPLOAD,
        &[video(b"bytes"), Field::Text("userId", "nobody")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(uploaded_files(&app).is_empty());
    assert!(app.state.pool.get_evaluation(1).await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_video_is_413() {
    let app = build_test_app_with(Duration::from_secs(60), |config| {
        config.max_upload_bytes = 16;
    });

    let response = post_multipart(&app, UPLOAD, &[video(&[0u8; 64])]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(uploaded_files(&app).is_empty());
    assert!(app.state.pool.get_evaluation(1).await.unwrap().is_none());
}

#[tokio::test]
async fn user_listing_is_scoped_and_newest_first() {
    let app = build_test_app(Duration::from_secs(60));

    for (title, user) in [("first", "7"), ("other", "8"), ("second", "7"), ("third", "7")] {
        let response = post_multipart(
            &app,
            UPLOAD,
            &[
                Field::Text("title", title),
                Field::Text("userId", user),
                video(b"bytes"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = get(&app, "/api/evaluations/user/7").await;
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
    assert!(list.as_array().unwrap().iter().all(|e| e["userId"] == 7));

    let response = get(&app, "/api/evaluations/user/1").await;
    assert_eq!(body_json(response).await, json!([]));
}
