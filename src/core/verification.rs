use crate::core::random::alphanumeric;
use crate::error::VerificationError;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

pub const VERIFICATION_KEY_LEN: usize = 12;
pub const VERIFICATION_KEY_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct VerificationKey {
    token: String,
    issued_at: Instant,
    matched: bool,
}

/// What the store currently holds for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Absent,
    Pending,
    /// Live and presented correctly at least once.
    Matched,
    /// Past its TTL but not yet reaped.
    Lapsed,
}

type Expiry = Reverse<(Instant, Uuid, String)>;

/// Short-lived step-up keys, at most one live key per owner.
///
/// Issuing a key replaces the previous one for that owner. Each key is removed
/// `ttl` after issuance by the [`KeyReaper`], which only deletes an entry if it
/// still holds the same token, so an old deadline never evicts a newer key.
/// Keys past their TTL are treated as absent even before the reaper runs.
#[derive(Clone, Debug)]
pub struct VerificationKeyStore {
    keys: Arc<DashMap<Uuid, VerificationKey>>,
    ttl: Duration,
    expiries: mpsc::UnboundedSender<Expiry>,
}

impl VerificationKeyStore {
    /// Creates a store and the reaper that must be spawned alongside it.
    #[must_use]
    pub fn new(ttl: Duration) -> (Self, KeyReaper) {
        let keys = Arc::new(DashMap::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let store = Self { keys: Arc::clone(&keys), ttl, expiries: tx };
        let reaper = KeyReaper { keys, rx, pending: BinaryHeap::new() };
        (store, reaper)
    }

    #[tracing::instrument(skip(self))]
    pub fn issue(&self, owner: Uuid) -> String {
        let token = alphanumeric(VERIFICATION_KEY_LEN);
        let issued_at = Instant::now();

        self.keys.insert(owner, VerificationKey { token: token.clone(), issued_at, matched: false });
        if self.expiries.send(Reverse((issued_at + self.ttl, owner, token.clone()))).is_err() {
            tracing::warn!("Key reaper is not running; key will only expire logically");
        }

        tracing::debug!("Verification key issued");
        token
    }

    #[must_use]
    pub fn check(&self, owner: Uuid, supplied: &str) -> bool {
        self.verify(owner, supplied).is_ok()
    }

    /// Same decision as [`Self::check`], keeping the reason for logs.
    ///
    /// # Errors
    /// `MissingVerificationKey` if no live key exists for `owner`,
    /// `TokenMismatch` if one exists but differs from `supplied`.
    pub fn verify(&self, owner: Uuid, supplied: &str) -> Result<(), VerificationError> {
        let mut key = self
            .keys
            .get_mut(&owner)
            .filter(|key| key.issued_at.elapsed() < self.ttl)
            .ok_or(VerificationError::MissingVerificationKey)?;

        if key.token.as_bytes() == supplied.as_bytes() {
            key.matched = true;
            Ok(())
        } else {
            Err(VerificationError::TokenMismatch)
        }
    }

    #[must_use]
    pub fn status(&self, owner: Uuid) -> KeyStatus {
        match self.keys.get(&owner) {
            None => KeyStatus::Absent,
            Some(key) if key.issued_at.elapsed() >= self.ttl => KeyStatus::Lapsed,
            Some(key) if key.matched => KeyStatus::Matched,
            Some(_) => KeyStatus::Pending,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Owns the expiry schedule of a [`VerificationKeyStore`].
#[derive(Debug)]
pub struct KeyReaper {
    keys: Arc<DashMap<Uuid, VerificationKey>>,
    rx: mpsc::UnboundedReceiver<Expiry>,
    pending: BinaryHeap<Expiry>,
}

impl KeyReaper {
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            let next_deadline = self.pending.peek().map(|Reverse((deadline, _, _))| *deadline);

            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(expiry) => self.pending.push(expiry),
                    None => break,
                },
                () = sleep_until(next_deadline) => self.reap_due(),
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Key reaper shutting down...");
    }

    fn reap_due(&mut self) {
        let now = Instant::now();
        while let Some(Reverse((deadline, _, _))) = self.pending.peek() {
            if *deadline > now {
                break;
            }
            let Some(Reverse((_, owner, token))) = self.pending.pop() else {
                break;
            };
            if self.keys.remove_if(&owner, |_, key| key.token == token).is_some() {
                tracing::debug!(owner = %owner, "Verification key expired");
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
