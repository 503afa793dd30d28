//! 日志与追踪系统
//! 初始化结构化日志

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 未设置 RUST_LOG 时使用的过滤规则：应用按配置级别，依赖库只输出警告
pub fn default_filter(level: &str) -> String {
    format!("{level},sqlx=warn,hyper=warn,lettre=warn,reqwest=warn", level = level.to_lowercase())
}

/// 初始化日志与追踪系统
///
/// 全局 subscriber 已存在时（例如测试中多次调用）静默跳过。
pub fn init_telemetry(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.logging.level)));

    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .boxed(),
    };

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()
        .is_err()
    {
        return;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        format = %config.logging.format,
        environment = %config.server.environment,
        "Telemetry initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_dependencies() {
        let filter = default_filter("DEBUG");
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}
