use crate::cli::ServeArgs;
use crate::demo::seed_demo_board;
use crate::infra::{AppState, InMemoryMarketplaceRepository};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use count_connect::config::AppConfig;
use count_connect::error::AppError;
use count_connect::marketplace::MarketplaceService;
use count_connect::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.seed_demo {
        config.marketplace.seed_demo_data = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryMarketplaceRepository::default());
    let marketplace = Arc::new(MarketplaceService::new(repository));
    if config.marketplace.seed_demo_data {
        let board = seed_demo_board(&*marketplace)?;
        info!(
            companies = 2,
            students = 2,
            warehouse_job = %board.warehouse_job,
            retail_job = %board.retail_job,
            "demo board seeded"
        );
    }

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "count connect marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
