//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    http::{header, HeaderName, HeaderValue, Method, Uri},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::{
    auth::middleware::ADMIN_PASSWORD_HEADER,
    error::AppError,
    handlers,
    middleware::{self, AppState},
    services::device::FINGERPRINT_HEADER,
};

/// 请求体上限（1 MiB）
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_path = state.config.security.admin_path.clone();

    // 公开端点（健康检查 / 指标）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics_export));

    // 隐藏后台（由 access_gate_middleware 保护）
    let admin_routes = Router::new()
        .route(&admin_path, get(handlers::admin::dashboard))
        .route(&format!("{}/dashboard", admin_path), get(handlers::admin::dashboard))
        .route(
            &format!("{}/login", admin_path),
            get(handlers::admin::login_page).post(handlers::admin::login),
        )
        .route(&format!("{}/logout", admin_path), post(handlers::admin::logout));

    // 站点公开 API
    let site_routes = Router::new()
        .route("/api/projects", get(handlers::project::list_public))
        .route(
            "/api/team-members",
            get(handlers::team_member::list_active).post(handlers::team_member::create),
        )
        .route(
            "/api/team-members/{id}",
            axum::routing::put(handlers::team_member::update).delete(handlers::team_member::delete),
        )
        .route(
            "/api/chatbot/settings",
            get(handlers::chatbot::get_settings).put(handlers::chatbot::update_settings),
        )
        .route("/api/chatbot/ask", post(handlers::chatbot::ask))
        .route("/api/pro-mode", get(handlers::pro_mode::get_status))
        .route("/api/contact", post(handlers::contact::submit));

    // 管理 API（处理器内校验管理员凭据）
    let admin_api_routes = Router::new()
        .route(
            "/api/admin/projects",
            get(handlers::project::admin_list).post(handlers::project::create),
        )
        .route(
            "/api/admin/projects/{id}",
            get(handlers::project::admin_get)
                .put(handlers::project::update)
                .delete(handlers::project::delete),
        )
        .route("/api/admin/team-members", get(handlers::team_member::admin_list))
        .route(
            "/api/admin/knowledge",
            get(handlers::knowledge::list).post(handlers::knowledge::create),
        )
        .route(
            "/api/admin/knowledge/{id}",
            axum::routing::put(handlers::knowledge::update).delete(handlers::knowledge::delete),
        )
        .route("/api/admin/pro-mode", axum::routing::put(handlers::pro_mode::update))

        // 安全监控
        .route("/api/security/events", get(handlers::security::list_events))
        .route("/api/security/alerts", get(handlers::security::list_alerts))
        .route(
            "/api/security/alerts/{id}/acknowledge",
            post(handlers::security::acknowledge_alert),
        )
        .route("/api/security/sessions", get(handlers::security::list_sessions))
        .route("/api/security/stats", get(handlers::security::stats))
        .route("/api/security/blocked", get(handlers::security::list_blocked))
        .route("/api/security/unblock", post(handlers::security::unblock))
        .route("/api/security/geo/{ip}", get(handlers::security::geo_lookup));

    // 组合所有路由；fallback 需在 layer 之前注册，旧后台路径才会经过闸门
    let router = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(site_routes)
        .merge(admin_api_routes)
        .fallback(fallback)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::access_gate_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::api_rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_tracking_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new());

    let router = match cors_layer(&state.config.security.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

async fn fallback(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}

/// 按配置的来源构建 CORS；未配置时不启用
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(ADMIN_PASSWORD_HEADER),
                HeaderName::from_static(FINGERPRINT_HEADER),
            ])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_disabled_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_none());
        assert!(cors_layer(&["https://example.com".to_string()]).is_some());
    }
}
