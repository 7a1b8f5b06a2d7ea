use crate::core::random::digits;
use crate::domain::card::Card;
use crate::error::{AppError, CardConflict, Result};
use crate::storage::card_repo::{CardDetails, CardRepository};
use rand::{Rng, rngs::OsRng};
use time::OffsetDateTime;
use uuid::Uuid;

const PAN_LEN: usize = 16;
const REFERENCE_ID_LEN: usize = 8;
const MAX_YEARS_VALID: i32 = 5;
const REFERENCE_ID_ATTEMPTS: usize = 8;

#[derive(Clone, Debug)]
pub struct CardService {
    repo: CardRepository,
}

impl CardService {
    #[must_use]
    pub const fn new(repo: CardRepository) -> Self {
        Self { repo }
    }

    /// Issues a card with a zero balance to `user_id`.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the user already holds a card.
    pub fn create(&self, user_id: Uuid, first_name: &str, last_name: &str) -> Result<Card> {
        self.create_with(user_id, first_name, last_name, || digits(REFERENCE_ID_LEN))
    }

    #[tracing::instrument(
        err(level = "warn"),
        skip(self, first_name, last_name, next_reference),
        fields(card_id = tracing::field::Empty)
    )]
    fn create_with(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        mut next_reference: impl FnMut() -> String,
    ) -> Result<Card> {
        let now = OffsetDateTime::now_utc();
        let mut card = Card {
            id: Uuid::new_v4(),
            user_id,
            reference_id: String::new(),
            name_on_card: format!("{} {}", first_name.trim(), last_name.trim()),
            real_pan: digits(PAN_LEN),
            real_exp_date: random_expiry(now),
            balance: 0,
            created_at: now,
            updated_at: now,
        };

        for _ in 0..REFERENCE_ID_ATTEMPTS {
            card.reference_id = next_reference();
            match self.repo.create(card.clone()) {
                Ok(()) => {
                    tracing::Span::current().record("card_id", tracing::field::display(card.id));
                    tracing::info!("Card created");
                    return Ok(card);
                }
                Err(CardConflict::OwnerHasCard) => return Err(AppError::Conflict("user already has a card".into())),
                Err(CardConflict::ReferenceTaken) => {
                    tracing::debug!(reference_id = %card.reference_id, "Reference id collision, drawing again");
                }
            }
        }

        tracing::error!("Exhausted reference id attempts");
        Err(AppError::Internal)
    }

    /// Returns the card held by `user_id`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user has no card.
    pub fn card_for(&self, user_id: Uuid) -> Result<Card> {
        self.repo.find_by_user(user_id).ok_or(AppError::NotFound)
    }

    /// Adds `amount` to the balance of the card with `reference_id`.
    ///
    /// # Errors
    /// `BadRequest` for a non-positive amount or an overflowing balance,
    /// `NotFound` for an unknown reference.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub fn load(&self, reference_id: &str, amount: i64) -> Result<Card> {
        if amount <= 0 {
            return Err(AppError::BadRequest("amount must be positive".into()));
        }

        self.repo
            .update_by_reference(reference_id, |card| -> Result<()> {
                card.balance = card
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| AppError::BadRequest("balance overflow".into()))?;
                card.updated_at = OffsetDateTime::now_utc();
                Ok(())
            })
            .ok_or(AppError::NotFound)?
    }

    /// Overwrites number, expiry and reference id of the caller's card `card_id`.
    ///
    /// The CVV follows the new number.
    ///
    /// # Errors
    /// `BadRequest` for a malformed field, `Conflict` if the reference id is
    /// held by another card, `NotFound` if the caller holds no card `card_id`.
    #[tracing::instrument(err(level = "warn"), skip(self, details))]
    pub fn update(&self, user_id: Uuid, card_id: Uuid, details: CardDetails) -> Result<Card> {
        validate_details(&details)?;

        match self.repo.replace_details(user_id, card_id, details) {
            Some(Ok(card)) => {
                tracing::info!("Card details replaced");
                Ok(card)
            }
            Some(Err(_)) => Err(AppError::Conflict("reference id already in use".into())),
            None => Err(AppError::NotFound),
        }
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn validate_details(details: &CardDetails) -> Result<()> {
    if !is_digits(&details.card_number, PAN_LEN) {
        return Err(AppError::BadRequest("card number must be 16 digits".into()));
    }
    if !is_digits(&details.reference_id, REFERENCE_ID_LEN) {
        return Err(AppError::BadRequest("reference id must be 8 digits".into()));
    }

    let valid_expiry = details
        .expiry_date
        .split_once('/')
        .filter(|(month, year)| is_digits(month, 2) && is_digits(year, 2))
        .and_then(|(month, _)| month.parse::<u8>().ok())
        .is_some_and(|month| (1..=12).contains(&month));
    if !valid_expiry {
        return Err(AppError::BadRequest("expiry date must be MM/YY".into()));
    }

    Ok(())
}

fn random_expiry(now: OffsetDateTime) -> String {
    let month = OsRng.gen_range(1..=12);
    let year = (now.year() + OsRng.gen_range(1..=MAX_YEARS_VALID)) % 100;
    format!("{month:02}/{year:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CardService {
        CardService::new(CardRepository::new())
    }

    #[test]
    fn test_create_card() {
        let service = service();
        let user_id = Uuid::new_v4();

        let card = service.create(user_id, "Jane", "Doe").unwrap();
        assert_eq!(card.name_on_card, "Jane Doe");
        assert_eq!(card.real_pan.len(), 16);
        assert_eq!(card.reference_id.len(), 8);
        assert_eq!(card.balance, 0);
        assert_eq!(card.real_exp_date.len(), 5);
        assert_eq!(&card.real_exp_date[2..3], "/");
        assert_eq!(service.card_for(user_id).unwrap(), card);
    }

    #[test]
    fn test_second_card_conflicts() {
        let service = service();
        let user_id = Uuid::new_v4();
        service.create(user_id, "Jane", "Doe").unwrap();

        assert!(matches!(service.create(user_id, "Jane", "Doe"), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_load_balance() {
        let service = service();
        let card = service.create(Uuid::new_v4(), "Jane", "Doe").unwrap();

        let loaded = service.load(&card.reference_id, 2_500).unwrap();
        assert_eq!(loaded.balance, 2_500);
        let loaded = service.load(&card.reference_id, 500).unwrap();
        assert_eq!(loaded.balance, 3_000);
    }

    #[test]
    fn test_load_rejects_bad_input() {
        let service = service();
        let card = service.create(Uuid::new_v4(), "Jane", "Doe").unwrap();

        assert!(matches!(service.load(&card.reference_id, 0), Err(AppError::BadRequest(_))));
        assert!(matches!(service.load(&card.reference_id, -5), Err(AppError::BadRequest(_))));
        assert!(matches!(service.load("does-not-exist", 10), Err(AppError::NotFound)));

        service.load(&card.reference_id, i64::MAX).unwrap();
        assert!(matches!(service.load(&card.reference_id, 1), Err(AppError::BadRequest(_))));
        assert_eq!(service.card_for(card.user_id).unwrap().balance, i64::MAX);
    }

    #[test]
    fn test_missing_card() {
        assert!(matches!(service().card_for(Uuid::new_v4()), Err(AppError::NotFound)));
    }

    #[test]
    fn test_reference_collision_draws_again() {
        let service = service();
        let taken = service.create_with(Uuid::new_v4(), "Jane", "Doe", || "00000001".into()).unwrap();

        let mut draws = ["00000001", "00000001", "00000002"].into_iter();
        let card = service.create_with(Uuid::new_v4(), "John", "Roe", || draws.next().unwrap().into()).unwrap();
        assert_eq!(card.reference_id, "00000002");

        let loaded = service.load(&taken.reference_id, 10).unwrap();
        assert_eq!(loaded.user_id, taken.user_id);
        assert_eq!(service.card_for(card.user_id).unwrap().balance, 0);
    }

    #[test]
    fn test_reference_collisions_exhausted() {
        let service = service();
        service.create_with(Uuid::new_v4(), "Jane", "Doe", || "00000001".into()).unwrap();

        let user_id = Uuid::new_v4();
        let result = service.create_with(user_id, "John", "Roe", || "00000001".into());
        assert!(matches!(result, Err(AppError::Internal)));
        assert!(service.card_for(user_id).is_err());
    }

    fn details(card_number: &str, expiry_date: &str, reference_id: &str) -> CardDetails {
        CardDetails {
            card_number: card_number.into(),
            expiry_date: expiry_date.into(),
            reference_id: reference_id.into(),
        }
    }

    #[test]
    fn test_update_card_details() {
        let service = service();
        let card = service.create(Uuid::new_v4(), "Jane", "Doe").unwrap();

        let updated = service.update(card.user_id, card.id, details("4000123456789010", "01/31", "87654321")).unwrap();
        assert_eq!(updated.masked_pan(), "************9010");
        assert_eq!(updated.secrets().cvv, "048");
        assert_eq!(updated.secrets().expiry_date, "01/31");
        assert_eq!(service.load("87654321", 5).unwrap().balance, 5);
        assert!(matches!(service.load(&card.reference_id, 5), Err(AppError::NotFound)));
    }

    #[test]
    fn test_update_rejects_malformed_details() {
        let service = service();
        let card = service.create(Uuid::new_v4(), "Jane", "Doe").unwrap();

        for bad in [
            details("4000", "01/31", "87654321"),
            details("400012345678901x", "01/31", "87654321"),
            details("4000123456789010", "13/31", "87654321"),
            details("4000123456789010", "0131", "87654321"),
            details("4000123456789010", "00/31", "87654321"),
            details("4000123456789010", "01/31", "8765"),
        ] {
            assert!(matches!(service.update(card.user_id, card.id, bad), Err(AppError::BadRequest(_))));
        }
        assert_eq!(service.card_for(card.user_id).unwrap(), card);
    }

    #[test]
    fn test_update_conflicts_and_ownership() {
        let service = service();
        let mine = service.create(Uuid::new_v4(), "Jane", "Doe").unwrap();
        let theirs = service.create(Uuid::new_v4(), "John", "Roe").unwrap();

        let result = service.update(mine.user_id, mine.id, details("4000123456789010", "01/31", &theirs.reference_id));
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let result = service.update(mine.user_id, theirs.id, details("4000123456789010", "01/31", "87654321"));
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
