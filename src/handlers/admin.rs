//! 隐藏后台的登录、登出与概览
//!
//! 路由挂在 `security.admin_path` 下，访问控制由 access_gate_middleware 完成。

use crate::{
    auth::{
        cookies::{
            append_set_cookie, build_cookie, expire_cookie, CookieOptions, SecurityCookies, ADMIN_AUTH,
            BLOCK_TIMESTAMP, FAILED_ATTEMPTS, SECURITY_BLOCK,
        },
        AdminClaims,
    },
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::{path_has_prefix, AppState, ClientInfo},
    models::security::SecurityEventType,
    services::RateLimitScope,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
    /// 登录成功后跳转的后台路径
    pub redirect: Option<String>,
}

/// 登录页元数据
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    headers: HeaderMap,
) -> impl IntoResponse {
    let security = &state.config.security;
    let cookies = SecurityCookies::from_headers(&headers);
    let authenticated = match cookies.admin_token.as_deref() {
        Some(token) => state.verify_session(token, &client).await.is_some(),
        None => false,
    };

    success(json!({
        "login_path": security.login_path(),
        "admin_configured": state.admin_auth.is_configured(),
        "remaining_attempts": security.block_threshold.saturating_sub(cookies.failed_attempts),
        "authenticated": authenticated,
    }))
}

/// 管理员登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    headers: HeaderMap,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let security = &state.config.security;
    let monitor = &state.security_monitor;

    if monitor.is_blocked(&client.ip, Some(&client.fingerprint)).await {
        return Err(AppError::Blocked);
    }

    let decision = monitor
        .check_rate_limit(RateLimitScope::Login, &client.ip, &client.user_agent)
        .await;
    if !decision.allowed {
        tracing::warn!(ip = %client.ip, "Admin login rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    let secure = state.config.server.is_production();
    let session_cookie = CookieOptions {
        max_age_secs: security.cookie_max_age_secs,
        secure,
    };
    let mut response_headers = HeaderMap::new();

    if state.admin_auth.verify(&req.password) {
        let session = state
            .session_manager
            .create_or_update_session(&client.ip, &client.user_agent, &client.fingerprint)
            .await;
        spawn_location_lookup(&state, &client.ip, &session.id);

        let issued = state.session_tokens.issue(&session.id)?;
        state
            .session_manager
            .bind_token(&session.id, &issued.claims.jti)
            .await;
        monitor.clear_failed_logins(&client.ip).await;
        append_set_cookie(&mut response_headers, build_cookie(ADMIN_AUTH, &issued.token, session_cookie));
        for name in [FAILED_ATTEMPTS, SECURITY_BLOCK, BLOCK_TIMESTAMP] {
            append_set_cookie(&mut response_headers, expire_cookie(name, secure));
        }

        tracing::info!(ip = %client.ip, session_id = %session.id, "Admin login succeeded");

        let redirect = req
            .redirect
            .filter(|r| path_has_prefix(r, &security.admin_path) && !r.contains("//"))
            .unwrap_or_else(|| security.admin_path.clone());

        let body = json!({
            "success": true,
            "data": {
                "session_id": session.id,
                "expires_in": state.session_tokens.validity_secs(),
                "redirect": redirect,
            }
        });
        return Ok((StatusCode::OK, response_headers, Json(body)).into_response());
    }

    // Cookie 可被客户端丢弃，以服务端计数兜底
    let from_cookie = SecurityCookies::from_headers(&headers).failed_attempts.saturating_add(1);
    let attempts = monitor.record_failed_login(&client.ip).await.max(from_cookie);
    let threshold = security.block_threshold;

    monitor
        .record_event(
            SecurityEventType::FailedLogin,
            &client.ip,
            &client.user_agent,
            format!("Failed admin login attempt {} of {}", attempts, threshold),
        )
        .await;
    append_set_cookie(
        &mut response_headers,
        build_cookie(FAILED_ATTEMPTS, &attempts.to_string(), session_cookie),
    );

    if attempts >= threshold {
        let block_cookie = CookieOptions {
            max_age_secs: security.block_duration_secs,
            secure,
        };
        append_set_cookie(&mut response_headers, build_cookie(SECURITY_BLOCK, "true", block_cookie));
        append_set_cookie(
            &mut response_headers,
            build_cookie(BLOCK_TIMESTAMP, &Utc::now().timestamp_millis().to_string(), block_cookie),
        );

        monitor
            .block(
                &client.ip,
                Some(&client.fingerprint),
                state.block_duration(),
                "Too many failed admin logins",
            )
            .await;
        monitor
            .record_event(
                SecurityEventType::SuspiciousActivity,
                &client.ip,
                &client.user_agent,
                format!("Client blocked after {} failed admin logins", attempts),
            )
            .await;
    }

    let body = json!({
        "success": false,
        "error": "Invalid password",
        "remaining_attempts": threshold.saturating_sub(attempts),
    });
    Ok((StatusCode::UNAUTHORIZED, response_headers, Json(body)).into_response())
}

/// 地理位置查询失败不影响登录
fn spawn_location_lookup(state: &AppState, ip: &str, session_id: &str) {
    let geo = state.geo_service.clone();
    let sessions = state.session_manager.clone();
    let ip = ip.to_string();
    let session_id = session_id.to_string();

    tokio::spawn(async move {
        match geo.lookup(&ip).await {
            Ok(location) => {
                tracing::debug!(session_id = %session_id, location = %location.describe(), "Session located");
                sessions.attach_location(&session_id, location).await;
            }
            Err(e) => tracing::debug!(session_id = %session_id, error = %e, "Session location unavailable"),
        }
    });
}

/// 登出：结束会话并清除所有后台 Cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<AdminClaims>>,
) -> impl IntoResponse {
    if let Some(Extension(claims)) = claims {
        state.session_manager.end_session(&claims.sid).await;
    }

    let secure = state.config.server.is_production();
    let mut headers = HeaderMap::new();
    for name in [ADMIN_AUTH, FAILED_ATTEMPTS, SECURITY_BLOCK, BLOCK_TIMESTAMP] {
        append_set_cookie(&mut headers, expire_cookie(name, secure));
    }

    (headers, success_with_message("Logged out", json!({})))
}

/// 后台概览
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<AdminClaims>>,
) -> impl IntoResponse {
    let monitor = &state.security_monitor;
    let recent_alerts: Vec<_> = monitor.alerts(false).await.into_iter().take(5).collect();

    success(json!({
        "current_session": claims.map(|Extension(c)| c.sid),
        "security": monitor.stats().await,
        "sessions": state.session_manager.stats().await,
        "active_sessions": state.session_manager.active_sessions().await,
        "recent_alerts": recent_alerts,
    }))
}
