//! 作品集站点后台主入口

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use studio_backoffice::{
    config::AppConfig, db, handlers::health, middleware::AppState, routes, services::MailService, telemetry,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("studio-backoffice {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("STUDIO_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Studio backoffice starting...");

    // 3. 数据库连接池 + 迁移
    let db_pool = db::create_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;

    tracing::info!("Database initialized");

    // 4. 构建应用状态
    let mail_service = Arc::new(MailService::from_config(&config.email));
    let app_state = Arc::new(AppState::new(config.clone(), db_pool, mail_service)?);

    if !app_state.admin_auth.is_configured() {
        tracing::warn!("ADMIN_PASSWORD not set, all admin access will be rejected");
    }

    let sweeper = spawn_sweeper(app_state.clone());

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        admin_path = %config.security.admin_path,
        "Server listening"
    );

    // 7. 优雅关闭
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    sweeper.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 周期清理：过期会话、封禁、限流桶与地理位置缓存
fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let interval_secs = state.config.security.sweep_interval_secs.max(1);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let now = Utc::now();

            let purged_sessions = state.session_manager.sweep_at(now).await;
            state.security_monitor.cleanup_at(now).await;
            let purged_locations = state.geo_service.cleanup_at(now).await;

            if purged_sessions > 0 || purged_locations > 0 {
                tracing::debug!(purged_sessions, purged_locations, "Sweep completed");
            }
        }
    })
}

/// 优雅关闭信号处理
///
/// 收到信号后开始关闭；超过 `timeout_secs` 仍未完成时强制退出。
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("studio-backoffice {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: studio-backoffice [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过环境变量完成（STUDIO_ 前缀，或 DATABASE_URL / ADMIN_PASSWORD 等直接变量）");
    println!("  可用选项请参考 .env.example");
}
