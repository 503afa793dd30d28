//! 作品展示的 HTTP 处理器

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::project::*,
    repository::ProjectRepository,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 公开列表，支持 ?featured=true 与 ?category=
pub async fn list_public(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ProjectFilters>,
) -> Result<impl IntoResponse, AppError> {
    let projects = ProjectRepository::new(state.db.clone()).list(&filters).await?;
    Ok(success(projects))
}

pub async fn admin_list(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Query(filters): Query<ProjectFilters>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let projects = ProjectRepository::new(state.db.clone()).list(&filters).await?;
    Ok(success(projects))
}

pub async fn admin_get(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let project = ProjectRepository::new(state.db.clone())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("project"))?;
    Ok(success(project))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let project = ProjectRepository::new(state.db.clone()).create(&req).await?;
    tracing::info!(project_id = %project.id, title = %project.title, "Project created");

    Ok((StatusCode::CREATED, success_with_message("Project created", project)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let project = ProjectRepository::new(state.db.clone())
        .update(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("project"))?;
    tracing::info!(project_id = %id, "Project updated");

    Ok(success_with_message("Project updated", project))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    if !ProjectRepository::new(state.db.clone()).delete(id).await? {
        return Err(AppError::not_found("project"));
    }
    tracing::info!(project_id = %id, "Project deleted");

    Ok(success_with_message("Project deleted", json!({ "id": id })))
}
