//! 团队成员的 HTTP 处理器

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::team_member::*,
    repository::TeamMemberRepository,
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

/// 公开列表，仅在职成员
pub async fn list_active(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let members = TeamMemberRepository::new(state.db.clone()).list(true).await?;
    Ok(success(members))
}

/// 管理列表，包含停用成员
pub async fn admin_list(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let members = TeamMemberRepository::new(state.db.clone()).list(false).await?;
    Ok(success(members))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<CreateTeamMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let member = TeamMemberRepository::new(state.db.clone()).create(&req).await?;
    tracing::info!(member_id = %member.id, name = %member.name, "Team member created");

    Ok((StatusCode::CREATED, success_with_message("Team member created", member)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateTeamMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let member = TeamMemberRepository::new(state.db.clone())
        .update(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("team member"))?;

    Ok(success_with_message("Team member updated", member))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    if !TeamMemberRepository::new(state.db.clone()).delete(id).await? {
        return Err(AppError::not_found("team member"));
    }
    tracing::info!(member_id = %id, "Team member deleted");

    Ok(success_with_message("Team member deleted", json!({ "id": id })))
}
