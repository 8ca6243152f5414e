use log::*;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

mod controller;
mod error;
pub(crate) mod params;
pub mod router;

pub use error::Error;
pub use service::AppState;

/// Bind the configured interface and serve until Ctrl-C.
///
/// On shutdown the state's token is cancelled, which cancels every in-flight
/// transcript resolution before the server drains.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", host, app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    info!("Server starting... listening for connections on http://{server_url}");

    let shutdown = app_state.shutdown.clone();
    let router = router::define_routes(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling in-flight transcript requests");
    shutdown.cancel();
}
