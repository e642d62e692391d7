use osis_config::PortalConfig;
use osis_server::{AppState, app, telemetry};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PortalConfig::from_env()?;
    telemetry::init_tracing(config.log_format);

    let addr = config.socket_addr()?;
    let state = AppState::new(config)?;
    state.warn_if_admin_open();
    let cleanup = state.spawn_rate_limit_cleanup(Duration::from_secs(60));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "OSIS portal listening");

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(telemetry::shutdown_signal())
    .await?;

    for task in cleanup {
        task.abort();
    }
    info!("Server stopped");
    Ok(())
}
