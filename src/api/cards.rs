use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::Envelope;
use crate::api::schemas::cards::{CardView, CreateCard, LoadCard, UpdateCard};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn create_card(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCard>,
) -> Result<impl IntoResponse> {
    let card = state.card_service.create(auth_user.session.user_id, &payload.first_name, &payload.last_name)?;
    Ok((StatusCode::CREATED, Json(Envelope::new(CardView::from(card)))))
}

pub async fn load_card(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<LoadCard>,
) -> Result<impl IntoResponse> {
    let card = state.card_service.load(&payload.reference_id, payload.amount)?;
    Ok(Json(Envelope::new(CardView::from(card))))
}

pub async fn update_card(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<UpdateCard>,
) -> Result<impl IntoResponse> {
    let card = state.card_service.update(auth_user.session.user_id, card_id, payload.into())?;
    Ok(Json(Envelope::new(CardView::from(card))))
}
