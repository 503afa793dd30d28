//! 管理接口认证
//!
//! 管理员凭据可以来自 Bearer 头、`x-admin-password` 头、`?password=` 查询参数、
//! 请求体中的 `password` 字段或有效的 admin-auth Cookie，任意一个匹配即可。

use crate::{
    auth::{cookies::SecurityCookies, session_token::AdminClaims},
    error::AppError,
    middleware::{AppState, ClientInfo},
    models::security::SecurityEventType,
};
use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, HeaderMap},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Unauthorized)
}

#[derive(Debug, Deserialize)]
struct PasswordQuery {
    password: Option<String>,
}

/// 请求中携带的全部管理员凭据（尚未校验）
#[derive(Debug, Clone)]
pub struct AdminCredential {
    pub bearer: Option<String>,
    pub header_password: Option<String>,
    pub query_password: Option<String>,
    pub cookie_token: Option<String>,
    pub client: ClientInfo,
    pub route: String,
}

impl FromRequestParts<Arc<AppState>> for AdminCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let client = ClientInfo::from_request_parts(parts, state).await?;

        let query_password = Query::<PasswordQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.password)
            .filter(|p| !p.is_empty());

        let header_password = parts
            .headers
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|p| !p.is_empty());

        Ok(Self {
            bearer: extract_token(&parts.headers).ok(),
            header_password,
            query_password,
            cookie_token: SecurityCookies::from_headers(&parts.headers).admin_token,
            client,
            route: format!("{} {}", parts.method, parts.uri.path()),
        })
    }
}

impl AdminCredential {
    /// 校验凭据；`body_password` 为请求体中的 password 字段
    ///
    /// 失败时记录 unauthorized_access 事件并返回 401。
    pub async fn authorize(&self, state: &AppState, body_password: Option<&str>) -> Result<(), AppError> {
        if self.matches(state, body_password).await {
            return Ok(());
        }

        let details = if state.admin_auth.is_configured() {
            format!("Invalid admin credentials for {}", self.route)
        } else {
            format!("Admin access attempted for {} with no admin password configured", self.route)
        };

        state
            .security_monitor
            .record_event(
                SecurityEventType::UnauthorizedAccess,
                &self.client.ip,
                &self.client.user_agent,
                details,
            )
            .await;

        Err(AppError::Unauthorized)
    }

    async fn matches(&self, state: &AppState, body_password: Option<&str>) -> bool {
        if !state.admin_auth.is_configured() {
            return false;
        }

        let secrets = [
            self.bearer.as_deref(),
            self.header_password.as_deref(),
            self.query_password.as_deref(),
            body_password,
        ];
        if secrets
            .into_iter()
            .flatten()
            .any(|secret| state.admin_auth.verify(secret))
        {
            return true;
        }

        self.session_claims(state).await.is_some()
    }

    /// Cookie 中仍然有效的管理会话
    pub async fn session_claims(&self, state: &AppState) -> Option<AdminClaims> {
        let token = self.cookie_token.as_deref()?;
        state.verify_session(token, &self.client).await
    }
}
