use crate::api::rate_limit::{RateLimitService, log_rate_limit_events};
use crate::config::{Config, RateLimitConfig};
use crate::core::account_service::AccountService;
use crate::core::card_service::CardService;
use crate::core::reveal::RevealGate;
use crate::core::session_service::SessionService;
use axum::body::Body;
use axum::http::{HeaderName, Method, Request, header};
use axum::{Router, middleware::from_fn_with_state, routing::{get, patch, post}};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod cards;
pub mod me;
pub mod middleware;
pub mod rate_limit;
pub mod schemas;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct AppState {
    pub session_service: SessionService,
    pub account_service: AccountService,
    pub card_service: CardService,
    pub reveal_gate: RevealGate,
    pub rate_limit_service: RateLimitService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub session_service: SessionService,
    pub account_service: AccountService,
    pub card_service: CardService,
    pub reveal_gate: RevealGate,
    pub rate_limit_service: RateLimitService,
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
}

/// Configures and returns the application router.
///
/// # Errors
/// Returns an error if a rate limiter tier cannot be built from `config`.
pub fn app_router(config: &Config, services: ServiceContainer) -> anyhow::Result<Router> {
    let RateLimitConfig { per_second, burst, login_per_second, login_burst } = &config.rate_limit;

    let std_interval_ns = 1_000_000_000 / (*per_second).max(1);
    let standard_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(std_interval_ns))
            .burst_size((*burst).max(1))
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid standard rate limit configuration"))?,
    );

    // Login gets a stricter tier of its own.
    let login_interval_ns = 1_000_000_000 / (*login_per_second).max(1);
    let login_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(login_interval_ns))
            .burst_size((*login_burst).max(1))
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid login rate limit configuration"))?,
    );

    let state = AppState {
        session_service: services.session_service,
        account_service: services.account_service,
        card_service: services.card_service,
        reveal_gate: services.reveal_gate,
        rate_limit_service: services.rate_limit_service,
    };

    let login_routes = Router::new().route("/login", post(auth::login)).layer(GovernorLayer::new(login_conf));

    let api_routes = Router::new()
        .route("/me", get(me::me))
        .route("/me/verify", post(me::verify))
        .route("/me/card", post(me::reveal_card))
        .route("/me/refresh", post(auth::refresh))
        .route("/cards", post(cards::create_card))
        .route("/cards/load", post(cards::load_card))
        .route("/cards/{id}", patch(cards::update_card))
        .layer(GovernorLayer::new(standard_conf));

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    Ok(login_routes
        .merge(api_routes)
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events))
        .layer(cors_layer())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = response.status();
                        span.record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state))
}
