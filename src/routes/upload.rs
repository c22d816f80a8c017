use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::db::{DbId, Evaluation};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{
    generate_video_filename, video_extension, video_url, UploadWriter, WriteError,
};

const VIDEO_FIELD: &str = "video";

#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    user_id: Option<DbId>,
    video: Option<StoredVideo>,
}

struct StoredVideo {
    filename: String,
    path: PathBuf,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Evaluation>)> {
    let mut form = UploadForm::default();

    if let Err(e) = read_form(&state, &mut multipart, &mut form).await {
        discard(form.video.as_ref()).await;
        return Err(e);
    }

    let Some(video) = form.video else {
        return Err(AppError::BadRequest("No video file uploaded".to_string()));
    };

    let user_id = form.user_id.unwrap_or(state.config.default_user_id);
    let evaluation = match state
        .driver
        .submit_evaluation(user_id, form.title.as_deref(), &video_url(&video.filename))
        .await
    {
        Ok(evaluation) => evaluation,
        Err(e) => {
            discard(Some(&video)).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        evaluation_id = evaluation.id,
        user_id,
        filename = %video.filename,
        "Video uploaded"
    );
    Ok((StatusCode::CREATED, Json(evaluation)))
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> AppResult<()> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                form.title = Some(field.text().await.map_err(multipart_error)?);
            }
            "userId" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = raw
                        .parse()
                        .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))?;
                    form.user_id = Some(id);
                }
            }
            VIDEO_FIELD => {
                if form.video.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one video file may be uploaded".to_string(),
                    ));
                }

                let content_type = field.content_type().unwrap_or("").to_string();
                let extension = video_extension(&content_type).ok_or_else(|| {
                    AppError::BadRequest(
                        "Invalid file type. Only MP4, WebM, and MOV videos are allowed."
                            .to_string(),
                    )
                })?;

                let filename = generate_video_filename(extension);
                let path = state.config.upload_folder.join(&filename);
                let mut writer =
                    UploadWriter::create(path, state.config.max_upload_bytes).await?;

                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    writer.write_chunk(&chunk).await.map_err(|e| match e {
                        WriteError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
                            "Video exceeds the maximum upload size of {limit} bytes"
                        )),
                        WriteError::Io(e) => e.into(),
                    })?;
                }

                if writer.written() == 0 {
                    return Err(AppError::BadRequest("No video file uploaded".to_string()));
                }

                let path = writer.finish().await?;
                form.video = Some(StoredVideo { filename, path });
            }
            _ => {}
        }
    }
    Ok(())
}

async fn discard(video: Option<&StoredVideo>) {
    if let Some(video) = video {
        if let Err(e) = tokio::fs::remove_file(&video.path).await {
            tracing::warn!(path = %video.path.display(), error = %e, "Failed to remove rejected upload");
        }
    }
}
