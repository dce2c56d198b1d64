use payment_match_rust::{api, AppConfig, ReconcileService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 本地时间格式, RUST_LOG 优先于配置
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    info!("Starting server with config: {:?}", config);

    let settings = config.matching.settings()?;
    info!(
        "Matching: tolerance {}, max results {}, max invoices {}, policy {:?}, timeout {:?}",
        settings.tolerance,
        settings.max_results,
        settings.max_invoices,
        settings.oversize_policy,
        settings.search_timeout
    );

    let service = Arc::new(ReconcileService::new(settings));
    let app = api::router(service);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/reconcile         - match payment to invoices");
    info!("  POST /api/reconcile/export  - oldest-first allocation as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
