//! Pro Mode 维护窗口

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::pro_mode::{ProModeStatus, UpdateProModeRequest},
    repository::SettingsRepository,
};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use validator::Validate;

/// 公开状态，附带当前是否生效
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let config = SettingsRepository::new(state.db.clone()).pro_mode().await?;
    Ok(success(ProModeStatus::from(config)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<UpdateProModeRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let repo = SettingsRepository::new(state.db.clone());
    let merged = req.apply_to(&repo.pro_mode().await?);

    // 与已保存的窗口合并后再次校验
    if let (Some(start), Some(end)) = (merged.start_time, merged.end_time) {
        if end <= start {
            return Err(AppError::validation(vec![
                "end_time: end_time must be after start_time".to_string(),
            ]));
        }
    }

    let saved = repo.save_pro_mode(&merged).await?;
    let status = ProModeStatus::from(saved);
    tracing::info!(
        enabled = status.config.enabled,
        active_now = status.is_active_now,
        "Pro Mode updated"
    );

    Ok(success_with_message("Pro Mode updated", status))
}
