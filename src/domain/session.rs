use crate::core::random::generate_opaque_token;
use time::OffsetDateTime;
use uuid::Uuid;

/// An authenticated actor. Everything here travels inside the signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub email: String,
    pub origin: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn new(email: impl Into<String>, user_id: Uuid, origin: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: generate_opaque_token(),
            user_id,
            email: email.into(),
            origin: origin.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The only artifact handed to callers. Never looked up server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub auth_token: String,
}

impl SessionCredentials {
    #[must_use]
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self { auth_token: auth_token.into() }
    }
}
