use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_centre_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use culture_centre::centre::{
    CentreService, ClassGateway, InMemoryClassGateway, JsonFileClassGateway,
};
use culture_centre::config::AppConfig;
use culture_centre::error::AppError;
use culture_centre::telemetry;
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
    if let Some(path) = args.data_path.take() {
        config.centre.data_path = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    match config.centre.data_path.clone() {
        Some(path) => {
            let gateway = JsonFileClassGateway::open(path)?;
            info!(path = %gateway.path().display(), "using JSON class store");
            serve(config, Arc::new(gateway)).await
        }
        None => {
            info!("using in-memory class store");
            serve(config, Arc::new(InMemoryClassGateway::new())).await
        }
    }
}

async fn serve<G>(config: AppConfig, gateway: Arc<G>) -> Result<(), AppError>
where
    G: ClassGateway + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(
        CentreService::new(gateway).with_teacher_passcode(config.centre.teacher_passcode.clone()),
    );

    let app = with_centre_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "culture centre service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
