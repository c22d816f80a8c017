use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::db::{DbId, Evaluation, NewUser};
use crate::error::{AppError, AppResult};
use crate::password::hash_password;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub id: DbId,
    pub username: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserCreated>)> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input.validate()?;

    let plaintext = input.password;
    let password = tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Taken names surface as StoreError::UsernameTaken, rendered as 409.
    let user = state
        .pool
        .register_user(NewUser {
            username: input.username,
            password,
        })
        .await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserCreated {
            id: user.id,
            username: user.username,
        }),
    ))
}

fn parse_id(raw: &str, what: &str) -> AppResult<DbId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {what} ID")))
}

pub async fn get_evaluation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Evaluation>> {
    let id = parse_id(&id, "evaluation")?;
    let evaluation = state
        .pool
        .get_evaluation(id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "Evaluation",
            id,
        })?;
    Ok(Json(evaluation))
}

pub async fn list_user_evaluations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Evaluation>>> {
    let user_id = parse_id(&user_id, "user")?;
    let evaluations = state.pool.get_evaluations_by_user_id(user_id).await?;
    Ok(Json(evaluations))
}
