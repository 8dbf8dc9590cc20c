use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{Database, NewProfile, ProfileUpdate, StoreError, UserProfile};
use crate::prompt;
use crate::provider::{ChatModel, Message};

use super::error::AppError;

/// Shared application state. The database and the model client are built
/// once at startup; both are safe to share across concurrent requests.
pub struct AppState {
    pub db: Database,
    pub model: Arc<dyn ChatModel>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /chat - Answer one message, optionally personalized, and log the
/// exchange for identified callers.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // A lookup miss is not an error: it degrades to no personalization
    let profile = match &req.user_id {
        Some(clerk_id) => match state.db.get_user(clerk_id) {
            Ok(profile) => Some(profile),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let context = profile
        .as_ref()
        .map(prompt::patient_context)
        .unwrap_or_default();
    let system_prompt = prompt::build_system_prompt(&context);

    let messages = [Message::system(system_prompt), Message::user(&req.message)];
    let response = state.model.chat(&messages).await?;

    if let Some(profile) = &profile {
        state.db.append_chat(profile.id, &req.message, &response)?;
        info!("Chat logged for user #{}", profile.id);
    }

    Ok(Json(ChatResponse { response }))
}

/// GET /users/{clerk_id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(clerk_id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.db.get_user(&clerk_id)?))
}

/// POST /users - 201 on success, 400 if the clerk id is already registered.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewProfile>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = state.db.create_user(&body)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PATCH /users/{clerk_id} - Partial update; absent fields stay untouched.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(clerk_id): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.db.update_user(&clerk_id, &body)?))
}
