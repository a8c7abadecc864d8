use crate::cli::ServeArgs;
use crate::infra::{open_backend, AppState, Backend};
use crate::routes::with_board_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use connxt::config::AppConfig;
use connxt::error::AppError;
use connxt::telemetry;
use connxt::workflows::board::{BoardStore, JobBoardService};
use std::sync::atomic::Ordering;
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
    if let Some(database) = args.storage.database.take() {
        config.storage.database_path = database;
    }

    telemetry::init(&config.telemetry)?;

    match open_backend(&config.storage)? {
        Backend::Memory(store) => serve(config, store).await,
        Backend::Sqlite(store) => serve(config, store).await,
    }
}

async fn serve<S>(config: AppConfig, store: Arc<S>) -> Result<(), AppError>
where
    S: BoardStore + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let board_service = Arc::new(JobBoardService::new(store, config.board));
    if let Some(username) = config.storage.superuser.as_deref() {
        let admin = board_service.ensure_superuser(username)?;
        info!(admin = %admin.id, username = %admin.username, "superuser bootstrapped");
    }

    let app = with_board_routes(board_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        capacity_basis = ?config.board.capacity_basis,
        "connxt job board ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
