//! 指标处理器
//! 提供 /metrics 端点（JSON 快照）

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    db,
    middleware::AppState,
    models::security::{SecurityStats, SessionStats},
};

/// 指标响应
#[derive(Serialize)]
pub struct MetricsResponse {
    pub process_uptime_secs: u64,
    pub db_pool: db::PoolSnapshot,
    pub security: SecurityStats,
    pub sessions: SessionStats,
    pub rate_limit_keys: usize,
}

/// 指标暴露端点
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let monitor = &state.security_monitor;

    Json(MetricsResponse {
        process_uptime_secs: crate::handlers::health::get_uptime(),
        db_pool: db::record_pool_metrics(&state.db),
        security: monitor.stats().await,
        sessions: state.session_manager.stats().await,
        rate_limit_keys: monitor.rate_limiter().tracked_keys().await,
    })
}
