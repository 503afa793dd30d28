//! 联系表单

use crate::{
    error::AppError,
    handlers::{success_with_message, ApiJson},
    middleware::{AppState, ClientInfo},
    models::contact::ContactRequest,
    services::RateLimitScope,
};
use axum::{extract::State, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

pub async fn submit(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    ApiJson(req): ApiJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision = state
        .security_monitor
        .check_rate_limit(RateLimitScope::Contact, &client.ip, &client.user_agent)
        .await;
    if !decision.allowed {
        return Err(AppError::RateLimitExceeded);
    }

    req.validate()?;

    state.mail_service.send_contact(&req).await.map_err(|e| {
        tracing::error!(error = %e, "Contact form delivery failed");
        AppError::upstream(e.to_string())
    })?;

    tracing::info!(ip = %client.ip, "Contact form delivered");

    Ok(success_with_message(
        "Message sent",
        json!({ "remaining": decision.remaining }),
    ))
}
