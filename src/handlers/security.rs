//! 安全监控 API（需要管理员凭据）

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::security::SecurityEventType,
    services::security_monitor::EventFilter,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_EVENT_LIMIT: usize = 100;
const MAX_EVENT_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub ip: Option<String>,
}

impl EventsQuery {
    fn filter(&self) -> Result<EventFilter, AppError> {
        let event_type = self
            .event_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::parse::<SecurityEventType>)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(EventFilter {
            event_type,
            ip: self.ip.clone().filter(|ip| !ip.is_empty()),
        })
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_EVENT_LIMIT)
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let events = state
        .security_monitor
        .events(query.limit(), &query.filter()?)
        .await;
    Ok(success(events))
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_true")]
    pub include_acknowledged: bool,
}

fn default_true() -> bool {
    true
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let alerts = state.security_monitor.alerts(query.include_acknowledged).await;
    Ok(success(alerts))
}

/// 确认告警，重复确认不产生副作用
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let alert = state
        .security_monitor
        .acknowledge_alert(id)
        .await
        .ok_or_else(|| AppError::not_found("alert"))?;
    Ok(success_with_message("Alert acknowledged", alert))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    #[serde(default)]
    pub active: bool,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Query(query): Query<SessionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let sessions = if query.active {
        state.session_manager.active_sessions().await
    } else {
        state.session_manager.all_sessions().await
    };
    Ok(success(sessions))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    Ok(success(json!({
        "security": state.security_monitor.stats().await,
        "sessions": state.session_manager.stats().await,
    })))
}

pub async fn list_blocked(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    Ok(success(state.security_monitor.blocked_clients().await))
}

#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn unblock(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<UnblockRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;

    let ip = req.ip.trim();
    if ip.is_empty() {
        return Err(AppError::validation(vec!["ip: ip is required".to_string()]));
    }

    if !state.security_monitor.unblock(ip).await {
        return Err(AppError::not_found("blocked client"));
    }
    tracing::info!(ip = %ip, by = %credential.client.ip, "Client unblocked by admin");

    Ok(success_with_message("Client unblocked", json!({ "ip": ip })))
}

pub async fn geo_lookup(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, None).await?;

    let location = state.geo_service.lookup(&ip).await?;
    Ok(success(location))
}
