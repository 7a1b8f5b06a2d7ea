use crate::core::card_service::CardService;
use crate::core::verification::{KeyStatus, VerificationKeyStore};
use crate::domain::card::CardSecrets;
use crate::domain::session::Session;
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};

/// Message returned for any refused reveal, whatever the reason.
pub const REVEAL_REJECTED: &str = "invalid verification token";

#[derive(Clone, Debug)]
struct Metrics {
    keys_issued_total: Counter<u64>,
    reveals_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("fakeprovider-server");
        Self {
            keys_issued_total: meter
                .u64_counter("verification_keys_issued_total")
                .with_description("Total number of step-up verification keys issued")
                .build(),
            reveals_total: meter
                .u64_counter("card_reveals_total")
                .with_description("Card reveal attempts by outcome")
                .build(),
        }
    }
}

/// Where an owner stands in the step-up flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// Valid session, no key held.
    Authenticated,
    /// A key is live and its TTL is running.
    KeyIssued,
    /// The live key has been presented and the card released.
    Verified,
    /// The key's TTL ran out. Falls back to `Authenticated` once the key is reaped.
    Expired,
}

impl From<KeyStatus> for RevealState {
    fn from(status: KeyStatus) -> Self {
        match status {
            KeyStatus::Absent => Self::Authenticated,
            KeyStatus::Pending => Self::KeyIssued,
            KeyStatus::Matched => Self::Verified,
            KeyStatus::Lapsed => Self::Expired,
        }
    }
}

/// Sequences "issue key → present key → reveal card secrets".
///
/// A missing key and a wrong key produce the same rejection so callers cannot
/// tell whether a key was ever issued.
#[derive(Clone, Debug)]
pub struct RevealGate {
    keys: VerificationKeyStore,
    cards: CardService,
    metrics: Metrics,
}

impl RevealGate {
    #[must_use]
    pub fn new(keys: VerificationKeyStore, cards: CardService) -> Self {
        Self { keys, cards, metrics: Metrics::new() }
    }

    #[must_use]
    pub fn state(&self, session: &Session) -> RevealState {
        self.keys.status(session.user_id).into()
    }

    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn issue_key(&self, session: &Session) -> String {
        let previous = self.state(session);
        if previous != RevealState::Authenticated {
            tracing::debug!(previous = ?previous, "Replacing verification key");
        }

        let key = self.keys.issue(session.user_id);
        self.metrics.keys_issued_total.add(1, &[]);
        key
    }

    /// Releases the caller's card secrets if `supplied` matches their live key.
    ///
    /// # Errors
    /// `BadRequest(REVEAL_REJECTED)` for a missing, expired, overwritten or
    /// wrong key; `NotFound` if the key matched but the caller has no card.
    #[tracing::instrument(skip(self, session, supplied), fields(user_id = %session.user_id), err(level = "warn"))]
    pub fn reveal(&self, session: &Session, supplied: &str) -> Result<CardSecrets> {
        if let Err(reason) = self.keys.verify(session.user_id, supplied) {
            tracing::debug!(reason = %reason, state = ?self.state(session), "Reveal refused");
            self.metrics.reveals_total.add(1, &[KeyValue::new("outcome", "rejected")]);
            return Err(AppError::BadRequest(REVEAL_REJECTED.into()));
        }

        let card = self.cards.card_for(session.user_id)?;
        self.metrics.reveals_total.add(1, &[KeyValue::new("outcome", "revealed")]);
        tracing::info!(state = ?self.state(session), "Card secrets revealed");
        Ok(card.secrets())
    }
}
