use crate::domain::session::Session;
use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Session token payload. Every field is required: a token missing any of
/// them fails to deserialize instead of yielding defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,

    pub id: String,
    pub user_id: Uuid,
    pub email: String,
    pub origin: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Claims {
    /// Claims for `session`, valid over `[issued_at, expires_at)`.
    #[must_use]
    pub fn new(session: &Session, token_id: String, issued_at: OffsetDateTime, expires_at: OffsetDateTime) -> Self {
        Self {
            jti: token_id,
            iss: session.origin.clone(),
            sub: session.email.clone(),
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            id: session.id.clone(),
            user_id: session.user_id,
            email: session.email.clone(),
            origin: session.origin.clone(),
            created_at: session.created_at.unix_timestamp(),
            updated_at: session.updated_at.unix_timestamp(),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.exp <= now.unix_timestamp()
    }

    /// Rebuilds the session carried by these claims.
    ///
    /// # Errors
    /// Returns `SessionError::MalformedToken` if a timestamp is out of range.
    pub fn session(&self) -> Result<Session, SessionError> {
        let timestamp = |secs| OffsetDateTime::from_unix_timestamp(secs).map_err(|_| SessionError::MalformedToken);

        Ok(Session {
            id: self.id.clone(),
            user_id: self.user_id,
            email: self.email.clone(),
            origin: self.origin.clone(),
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        })
    }
}
