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

pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workers;

use crate::api::ServiceContainer;
use crate::api::rate_limit::RateLimitService;
use crate::config::Config;
use crate::core::account_service::AccountService;
use crate::core::card_service::CardService;
use crate::core::reveal::RevealGate;
use crate::core::session_service::SessionService;
use crate::core::verification::{VERIFICATION_KEY_TTL, VerificationKeyStore};
use crate::storage::card_repo::CardRepository;
pub use crate::workers::Workers;
use tokio::sync::watch;

/// Fully wired services plus the background work they depend on.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub workers: Workers,
}

impl App {
    #[must_use]
    pub fn build(config: &Config) -> Self {
        let session_service = SessionService::from_config(&config.auth);
        let account_service = AccountService::new(&config.login, session_service.clone());
        let card_service = CardService::new(CardRepository::new());
        let (keys, key_reaper) = VerificationKeyStore::new(VERIFICATION_KEY_TTL);
        let reveal_gate = RevealGate::new(keys, card_service.clone());
        let rate_limit_service = RateLimitService::new(config.server.trusted_proxies.clone());

        tracing::info!(user_id = %account_service.user_id(), "Configured login account");

        Self {
            services: ServiceContainer {
                session_service,
                account_service,
                card_service,
                reveal_gate,
                rate_limit_service,
            },
            workers: Workers { key_reaper },
        }
    }
}

/// Routes panics through `tracing` so they reach structured logs.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic payload");
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic.payload = payload, panic.location = %location, "Panic occurred");
    }));
}

/// Flips `shutdown_tx` on SIGINT or, on unix, SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
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
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = shutdown_tx.send(true);
    });
}
