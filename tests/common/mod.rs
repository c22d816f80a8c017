#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use podium::analysis::SimulatedAnalyzer;
use podium::config::Config;
use podium::db::MemStorage;
use podium::lifecycle::EvaluationDriver;
use podium::routes::build_router;
use podium::state::AppState;

pub const BOUNDARY: &str = "podium-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub cancel: CancellationToken,
    pub upload_dir: TempDir,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build the full router over a fresh store, with uploads going to a
/// temporary directory and analysis settling after `delay`.
pub fn build_test_app(delay: Duration) -> TestApp {
    build_test_app_with(delay, |_| {})
}

pub fn build_test_app_with(delay: Duration, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_upload_folder(upload_dir.path());
    config.analysis_delay = delay;
    config.analyzer_seed = Some(17);
    tweak(&mut config);

    let pool = MemStorage::shared();
    let cancel = CancellationToken::new();
    let (driver, _dispatcher) = EvaluationDriver::start(
        pool.clone(),
        Arc::new(SimulatedAnalyzer::new(config.analyzer_seed)),
        config.analysis_delay,
        cancel.clone(),
    );

    let state = Arc::new(AppState {
        pool,
        config: Arc::new(config),
        driver,
    });

    TestApp {
        router: build_router(state.clone()),
        state,
        cancel,
        upload_dir,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    app.router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub enum Field<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn multipart_body(fields: &[Field<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match field {
            Field::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Field::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: &TestApp, uri: &str, fields: &[Field<'_>]) -> Response<Body> {
    app.router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields)))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub fn video<'a>(data: &'a [u8]) -> Field<'a> {
    Field::File {
        name: "video",
        filename: "talk.mp4",
        content_type: "video/mp4",
        data,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Re-fetch an evaluation until it leaves `processing`.
pub async fn poll_until_settled(app: &TestApp, id: i64) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = get(app, &format!("/api/evaluations/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] != "processing" {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "evaluation {id} never settled"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn uploaded_files(app: &TestApp) -> Vec<String> {
    std::fs::read_dir(app.upload_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}
