//! HTTP 中间件
//! 请求追踪、后台访问闸门、API 限流

use crate::{
    auth::{
        cookies::SecurityCookies,
        password::AdminAuthenticator,
        session_token::{AdminClaims, SessionTokenService},
    },
    config::AppConfig,
    error::AppError,
    models::security::SecurityEventType,
    services::{
        device, rate_limiter::RateLimitRules, security_monitor::MonitorConfig, GeoService,
        MailService, RateLimitScope, SecurityMonitor, SessionManager,
    },
};
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 所有内存态服务都在这里创建并通过 Arc 注入处理器，测试可以构建互不影响的实例。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: sqlx::PgPool,
    pub admin_auth: Arc<AdminAuthenticator>,
    pub session_tokens: Arc<SessionTokenService>,
    pub security_monitor: Arc<SecurityMonitor>,
    pub session_manager: Arc<SessionManager>,
    pub mail_service: Arc<MailService>,
    pub geo_service: Arc<GeoService>,
}

impl AppState {
    pub fn new(config: AppConfig, db: sqlx::PgPool, mail_service: Arc<MailService>) -> Result<Self, AppError> {
        let security = &config.security;

        let mut monitor = SecurityMonitor::new(
            MonitorConfig {
                max_events: security.max_events,
                max_alerts: security.max_alerts,
                failed_login_window: Duration::seconds(security.block_duration_secs as i64),
            },
            RateLimitRules::from(security),
        );
        if mail_service.alerts_enabled() {
            monitor = monitor.with_notifier(mail_service.clone());
        }

        Ok(Self {
            admin_auth: Arc::new(AdminAuthenticator::from_config(security)),
            session_tokens: Arc::new(SessionTokenService::from_config(security)?),
            security_monitor: Arc::new(monitor),
            session_manager: Arc::new(SessionManager::new()),
            geo_service: Arc::new(GeoService::new(&config.geo)?),
            mail_service,
            db,
            config,
        })
    }

    pub fn block_duration(&self) -> Duration {
        Duration::seconds(self.config.security.block_duration_secs as i64)
    }

    /// 校验 admin-auth 令牌并确认其会话仍然有效
    ///
    /// 会话必须属于当前客户端（IP + 设备指纹），处于活跃状态，
    /// 且令牌未因登出或重新登录而被吊销。
    pub async fn verify_session(&self, token: &str, client: &ClientInfo) -> Option<AdminClaims> {
        let claims = self.session_tokens.validate(token).ok()?;
        if claims.sid != device::session_id(&client.ip, &client.fingerprint) {
            return None;
        }
        self.session_manager
            .is_token_current(&claims.sid, &claims.jti)
            .await
            .then_some(claims)
    }
}

/// 请求方身份：IP、UA 与设备指纹
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
    pub fingerprint: String,
}

impl ClientInfo {
    pub fn from_parts(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> Self {
        let ip = get_client_ip(headers, extensions, trust_proxy);
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let fingerprint = device::fingerprint_from_headers(headers, &ip);

        Self {
            ip,
            user_agent,
            fingerprint,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(client) = parts.extensions.get::<ClientInfo>() {
            return Ok(client.clone());
        }
        Ok(Self::from_parts(
            &parts.headers,
            &parts.extensions,
            state.config.security.trust_proxy,
        ))
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 指标标签只使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            303 => "303",
            400 => "400",
            401 => "401",
            404 => "404",
            429 => "429",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code).increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// `path` 是否等于 `prefix` 或位于其下
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// 后台访问闸门
///
/// 依次检查：旧后台路径一律 404；封禁（Cookie 或服务端）返回 404；
/// 登录页放行；其余后台路由需要有效且未吊销的 admin-auth 令牌，否则 303 跳转到登录页。
pub async fn access_gate_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let security = &state.config.security;
    let path = req.uri().path().to_string();

    if security.legacy_paths.iter().any(|p| path_has_prefix(&path, p)) {
        tracing::debug!(path = %path, "Legacy admin path requested");
        return Err(AppError::not_found(&path));
    }

    if !path_has_prefix(&path, &security.admin_path) {
        return Ok(next.run(req).await);
    }

    let client = ClientInfo::from_parts(req.headers(), req.extensions(), security.trust_proxy);
    let cookies = SecurityCookies::from_headers(req.headers());

    let cookie_blocked = cookies.is_blocked_at(security.block_threshold, state.block_duration(), Utc::now());
    if cookie_blocked
        || state
            .security_monitor
            .is_blocked(&client.ip, Some(&client.fingerprint))
            .await
    {
        tracing::warn!(ip = %client.ip, path = %path, cookie_blocked, "Blocked client denied admin access");
        return Err(AppError::Blocked);
    }

    if path == security.login_path() {
        req.extensions_mut().insert(client);
        return Ok(next.run(req).await);
    }

    let claims = match cookies.admin_token.as_deref() {
        Some(token) => {
            let claims = state.verify_session(token, &client).await;
            if claims.is_none() {
                state
                    .security_monitor
                    .record_event(
                        SecurityEventType::UnauthorizedAccess,
                        &client.ip,
                        &client.user_agent,
                        format!("Invalid or revoked admin session token for {}", path),
                    )
                    .await;
            }
            claims
        }
        None => None,
    };

    let Some(claims) = claims else {
        return Ok(Redirect::to(&login_redirect(&security.login_path(), &path)).into_response());
    };

    state
        .session_manager
        .create_or_update_session(&client.ip, &client.user_agent, &client.fingerprint)
        .await;

    req.extensions_mut().insert(client);
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn login_redirect(login_path: &str, original_path: &str) -> String {
    format!("{}?redirect={}", login_path, encode_query_value(original_path))
}

/// 百分号编码查询参数值（保留路径分隔符）
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// API 通用限流（按客户端 IP）
pub async fn api_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !req.uri().path().starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let client = ClientInfo::from_parts(req.headers(), req.extensions(), state.config.security.trust_proxy);
    let decision = state
        .security_monitor
        .check_rate_limit(RateLimitScope::Api, &client.ip, &client.user_agent)
        .await;

    if !decision.allowed {
        tracing::warn!(ip = %client.ip, limit = decision.limit, "API rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    Ok(response)
}

/// 获取客户端 IP 地址
///
/// 信任代理时依次读取 X-Forwarded-For（第一个地址）与 X-Real-IP，
/// 否则使用连接地址；都没有时返回 "unknown"。
pub fn get_client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(first_ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first_ip.to_string();
        }

        if let Some(real_ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return real_ip.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
