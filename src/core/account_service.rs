use crate::config::LoginConfig;
use crate::core::session_service::SessionService;
use crate::domain::session::{Session, SessionCredentials};
use crate::error::{AppError, Result};
use opentelemetry::{global, metrics::Counter};
use uuid::Uuid;

pub const INVALID_CREDENTIALS: &str = "invalid username or password";

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    login_failed_total: Counter<u64>,
    refresh_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("fakeprovider-server");
        Self {
            login_total: meter
                .u64_counter("auth_login_total")
                .with_description("Total number of successful login attempts")
                .build(),
            login_failed_total: meter
                .u64_counter("auth_login_failed_total")
                .with_description("Total number of rejected login attempts")
                .build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total number of session refreshes")
                .build(),
        }
    }
}

/// Login and session refresh for the single configured account.
#[derive(Clone, Debug)]
pub struct AccountService {
    username: String,
    password: String,
    user_id: Uuid,
    sessions: SessionService,
    metrics: Metrics,
}

impl AccountService {
    #[must_use]
    pub fn new(login: &LoginConfig, sessions: SessionService) -> Self {
        Self {
            username: login.username.clone(),
            password: login.password.clone(),
            user_id: login.user_id.unwrap_or_else(Uuid::new_v4),
            sessions,
            metrics: Metrics::new(),
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// # Errors
    /// `BadRequest(INVALID_CREDENTIALS)` on a mismatch; `Internal` if signing fails.
    #[tracing::instrument(skip(self, username, password), err(level = "warn"))]
    pub fn login(&self, username: &str, password: &str, origin: &str) -> Result<SessionCredentials> {
        if username != self.username || password != self.password {
            tracing::warn!("Login failed: invalid credentials");
            self.metrics.login_failed_total.add(1, &[]);
            return Err(AppError::BadRequest(INVALID_CREDENTIALS.into()));
        }

        let session = Session::new(username, self.user_id, origin);
        let credentials = self.sessions.create_session(&session)?;
        self.metrics.login_total.add(1, &[]);
        Ok(credentials)
    }

    /// Re-issues credentials for an authentic, possibly expired, token.
    ///
    /// # Errors
    /// `Unauthorized` for any failure other than expiry.
    #[tracing::instrument(skip(self, credentials), err(level = "warn"))]
    pub fn refresh(&self, credentials: &SessionCredentials) -> Result<SessionCredentials> {
        let session = self.sessions.refresh_session(credentials)?;
        let refreshed = self.sessions.update_session(&session)?;

        tracing::info!(user_id = %session.user_id, "Session refreshed");
        self.metrics.refresh_total.add(1, &[]);
        Ok(refreshed)
    }
}
