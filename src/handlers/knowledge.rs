//! 知识库管理

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::knowledge::*,
    repository::KnowledgeRepository,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub async fn list(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let entries = KnowledgeRepository::new(state.db.clone()).list(false).await?;
    Ok(success(entries))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<CreateKnowledgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let entry = KnowledgeRepository::new(state.db.clone()).create(&req).await?;
    Ok((StatusCode::CREATED, success_with_message("Knowledge entry created", entry)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateKnowledgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let entry = KnowledgeRepository::new(state.db.clone())
        .update(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("knowledge entry"))?;
    Ok(success_with_message("Knowledge entry updated", entry))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    if !KnowledgeRepository::new(state.db.clone()).delete(id).await? {
        return Err(AppError::not_found("knowledge entry"));
    }
    Ok(success_with_message("Knowledge entry deleted", json!({ "id": id })))
}
