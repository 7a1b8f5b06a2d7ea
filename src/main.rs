#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use fakeprovider_server::config::Config;
use fakeprovider_server::{App, Workers, telemetry};
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    fakeprovider_server::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (listener, app_router, shutdown_tx, shutdown_rx, workers) = async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        fakeprovider_server::spawn_signal_handler(shutdown_tx.clone());

        let app = App::build(&config);
        let app_router = fakeprovider_server::api::app_router(&config, app.services)?;

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(address = %addr, "listening");

        Ok::<(tokio::net::TcpListener, axum::Router, watch::Sender<bool>, watch::Receiver<bool>, Workers), anyhow::Error>(
            (listener, app_router, shutdown_tx, shutdown_rx, app.workers),
        )
    }
    .instrument(boot_span)
    .await?;

    let worker_tasks = workers.spawn_all(shutdown_rx.clone());

    let mut server_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = server_rx.wait_for(|&s| s).await;
        });

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Server error");
    }

    let _ = shutdown_tx.send(true);
    tokio::select! {
        () = async {
            futures::future::join_all(worker_tasks).await;
        } => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}
