//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{db, middleware::AppState};

static APP_START: Lazy<Instant> = Lazy::new(Instant::now);

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 记录启动时间（main 中尽早调用）
pub fn set_start_time() {
    Lazy::force(&APP_START);
}

/// 应用运行时间（秒）
pub fn get_uptime() -> u64 {
    APP_START.elapsed().as_secs()
}

/// 存活探针
/// 快速响应，不检查依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// 就绪探针
/// 检查数据库与管理员凭据配置
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let mut checks = Vec::new();

    let database = db::health_check(&state.db).await;
    checks.push(HealthCheck {
        name: "database".to_string(),
        status: if database.is_healthy() { "ok" } else { "error" }.to_string(),
        message: match database {
            db::HealthStatus::Healthy => None,
            db::HealthStatus::Unhealthy(msg) => Some(msg),
        },
    });

    // 未配置管理员密码不影响就绪，但需要在探针中可见
    checks.push(HealthCheck {
        name: "admin_auth".to_string(),
        status: if state.admin_auth.is_configured() { "ok" } else { "warn" }.to_string(),
        message: (!state.admin_auth.is_configured())
            .then(|| "No admin password configured; admin access is disabled".to_string()),
    });

    let ready = checks.iter().all(|c| c.status != "error");
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}
