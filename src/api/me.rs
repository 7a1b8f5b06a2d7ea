use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::Envelope;
use crate::api::schemas::cards::{CardView, Reveal, RevealedCard};
use crate::core::reveal::REVEAL_REJECTED;
use crate::error::{AppError, Result};
use axum::extract::rejection::JsonRejection;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn me(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let card = state.card_service.card_for(auth_user.session.user_id)?;
    Ok(Json(Envelope::new(CardView::from(card))))
}

pub async fn verify(auth_user: AuthUser, State(state): State<AppState>) -> impl IntoResponse {
    let key = state.reveal_gate.issue_key(&auth_user.session);
    (StatusCode::CREATED, Json(Envelope::new(key)))
}

/// Any unreadable body is answered like a wrong key.
pub async fn reveal_card(
    auth_user: AuthUser,
    State(state): State<AppState>,
    payload: std::result::Result<Json<Reveal>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let supplied = match payload {
        Ok(Json(Reveal { verification_token })) => verification_token.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Unreadable reveal request");
            return Err(AppError::BadRequest(REVEAL_REJECTED.into()));
        }
    };

    let secrets = state.reveal_gate.reveal(&auth_user.session, &supplied)?;
    Ok(Json(Envelope::new(RevealedCard::from(secrets))))
}
