use crate::api::AppState;
use crate::domain::session::{Session, SessionCredentials};
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer credentials taken from the `Authorization` header, not yet validated.
#[derive(Debug)]
pub struct BearerToken(pub SessionCredentials);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::Unauthorized)?;
        let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

        let token = auth_str.strip_prefix(BEARER_PREFIX).map(str::trim).ok_or(AppError::Unauthorized)?;
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(Self(SessionCredentials::new(token)))
    }
}

/// A caller holding a valid, unexpired session.
#[derive(Debug)]
pub struct AuthUser {
    pub session: Session,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(credentials) = BearerToken::from_request_parts(parts, state).await?;
        let session = state.session_service.session(&credentials)?;

        tracing::Span::current().record("user_id", tracing::field::display(session.user_id));
        Ok(Self { session })
    }
}
