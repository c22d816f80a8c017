//! HTTP client for the evaluation API.
//!
//! Mirrors what the web front end does: upload a video, then re-fetch the
//! evaluation on a fixed interval until it reaches a terminal state.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use crate::db::{DbId, Evaluation};
use crate::routes::UserCreated;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Evaluation {id} was still processing after {waited:?}")]
    Timeout { id: DbId, waited: Duration },

    #[error("Failed to read video: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct EvaluationClient {
    http: Client,
    base_url: String,
    poll_interval: Duration,
}

impl EvaluationClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register_user(&self, username: &str, password: &str) -> ClientResult<UserCreated> {
        let response = self
            .http
            .post(self.url("/api/users"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    /// Upload raw video bytes. `content_type` must be one of the accepted
    /// video MIME types or the server rejects the upload.
    pub async fn upload_video(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
        title: Option<&str>,
        user_id: Option<DbId>,
    ) -> ClientResult<Evaluation> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let mut form = Form::new().part("video", part);
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }
        if let Some(user_id) = user_id {
            form = form.text("userId", user_id.to_string());
        }

        let response = self
            .http
            .post(self.url("/api/evaluations/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    /// Upload a video file from disk, guessing its MIME type from the
    /// extension.
    pub async fn upload_file(&self, path: &Path, title: Option<&str>) -> ClientResult<Evaluation> {
        let data = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video");
        self.upload_video(data, file_name, content_type, title, None)
            .await
    }

    pub async fn get_evaluation(&self, id: DbId) -> ClientResult<Evaluation> {
        let response = self
            .http
            .get(self.url(&format!("/api/evaluations/{id}")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_user_evaluations(&self, user_id: DbId) -> ClientResult<Vec<Evaluation>> {
        let response = self
            .http
            .get(self.url(&format!("/api/evaluations/user/{user_id}")))
            .send()
            .await?;
        decode(response).await
    }

    /// Poll until the evaluation leaves `processing`, giving up after
    /// `timeout`.
    pub async fn wait_for_completion(&self, id: DbId, timeout: Duration) -> ClientResult<Evaluation> {
        let started = Instant::now();
        loop {
            let evaluation = self.get_evaluation(id).await?;
            if evaluation.status.is_terminal() {
                tracing::debug!(evaluation_id = id, status = %evaluation.status, "Evaluation settled");
                return Ok(evaluation);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(ClientError::Timeout { id, waited });
            }
            tokio::time::sleep(self.poll_interval.min(timeout - waited)).await;
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
