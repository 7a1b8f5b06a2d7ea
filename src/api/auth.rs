use crate::api::AppState;
use crate::api::middleware::BearerToken;
use crate::api::schemas::Envelope;
use crate::api::schemas::auth::Login;
use crate::error::Result;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Login>,
) -> Result<impl IntoResponse> {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let credentials = state.account_service.login(&payload.username, &payload.password, origin)?;
    Ok((StatusCode::CREATED, Json(Envelope::new(credentials.auth_token))))
}

/// Re-issues a token. Authentic tokens are accepted even after they expire.
pub async fn refresh(State(state): State<AppState>, BearerToken(credentials): BearerToken) -> Result<impl IntoResponse> {
    let refreshed = state.account_service.refresh(&credentials)?;
    Ok((StatusCode::CREATED, Json(Envelope::new(refreshed.auth_token))))
}
