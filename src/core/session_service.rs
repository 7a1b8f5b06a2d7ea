use crate::config::AuthConfig;
use crate::core::random::generate_opaque_token;
use crate::core::token::TokenSigner;
use crate::domain::auth::Claims;
use crate::domain::session::{Session, SessionCredentials};
use crate::error::SessionError;
use time::OffsetDateTime;

/// Stateless sessions: the signed token is the session record. Nothing is
/// stored server-side, so a leaked token stays valid until it expires.
#[derive(Clone, Debug)]
pub struct SessionService {
    signer: TokenSigner,
    max_age: time::Duration,
}

impl SessionService {
    #[must_use]
    pub fn new(secret: &[u8], max_age: std::time::Duration) -> Self {
        Self {
            signer: TokenSigner::new(secret),
            max_age: time::Duration::try_from(max_age).unwrap_or(time::Duration::MAX),
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.session_secret.as_bytes(),
            std::time::Duration::from_secs(config.session_max_age_secs),
        )
    }

    /// Issues credentials for a new session.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if the token cannot be produced.
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id), err(level = "warn"))]
    pub fn create_session(&self, session: &Session) -> Result<SessionCredentials, SessionError> {
        self.credentials(session)
    }

    /// Issues fresh credentials for a session that was refreshed.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if the token cannot be produced.
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id), err(level = "warn"))]
    pub fn update_session(&self, session: &Session) -> Result<SessionCredentials, SessionError> {
        self.credentials(session)
    }

    /// Validates the credentials and returns the session they carry.
    ///
    /// # Errors
    /// `MalformedToken`, `InvalidSignature` or `UnsupportedAlgorithm` when the
    /// token is not authentic, `ExpiredToken` when it is authentic but expired.
    pub fn session(&self, credentials: &SessionCredentials) -> Result<Session, SessionError> {
        let claims = self.signer.verify(&credentials.auth_token)?;
        if claims.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(SessionError::ExpiredToken);
        }
        claims.session()
    }

    /// Like [`Self::session`] but accepts expired tokens, returning the session
    /// with `updated_at` set to now. The caller re-issues the token.
    ///
    /// # Errors
    /// Any failure other than expiry.
    pub fn refresh_session(&self, credentials: &SessionCredentials) -> Result<Session, SessionError> {
        let claims = self.signer.verify(&credentials.auth_token)?;
        let mut session = claims.session()?;
        session.updated_at = OffsetDateTime::now_utc();
        Ok(session)
    }

    /// `Ok(true)` when the token is authentic but expired, `Ok(false)` when it
    /// is currently valid.
    ///
    /// # Errors
    /// Signature and format failures are returned rather than mapped to `false`.
    pub fn has_expired(&self, credentials: &SessionCredentials) -> Result<bool, SessionError> {
        let claims = self.signer.verify(&credentials.auth_token)?;
        Ok(claims.is_expired_at(OffsetDateTime::now_utc()))
    }

    fn credentials(&self, session: &Session) -> Result<SessionCredentials, SessionError> {
        let issued_at = OffsetDateTime::now_utc();
        let expires_at = issued_at.saturating_add(self.max_age);
        let claims = Claims::new(session, generate_opaque_token(), issued_at, expires_at);

        Ok(SessionCredentials::new(self.signer.sign(&claims)?))
    }
}
