use crate::domain::card::Card;
use crate::error::CardConflict;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory cards, one per user, with a unique reference id index.
///
/// Lock order is always `cards` then `references`.
#[derive(Clone, Debug, Default)]
pub struct CardRepository {
    cards: Arc<DashMap<Uuid, Card>>,
    references: Arc<DashMap<String, Uuid>>,
}

/// Replacement values for a card's number, expiry and reference id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_date: String,
    pub reference_id: String,
}

impl CardRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `card` unless its owner already has one or its reference id is taken.
    ///
    /// # Errors
    /// Returns the [`CardConflict`] that prevented the insert.
    pub fn create(&self, card: Card) -> Result<(), CardConflict> {
        let Entry::Vacant(slot) = self.cards.entry(card.user_id) else {
            return Err(CardConflict::OwnerHasCard);
        };

        match self.references.entry(card.reference_id.clone()) {
            Entry::Occupied(_) => Err(CardConflict::ReferenceTaken),
            Entry::Vacant(reference) => {
                reference.insert(card.user_id);
                slot.insert(card);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn find_by_user(&self, user_id: Uuid) -> Option<Card> {
        self.cards.get(&user_id).map(|card| card.value().clone())
    }

    /// Applies `update` to the card with `reference_id` and returns the result.
    pub fn update_by_reference<E>(
        &self,
        reference_id: &str,
        update: impl FnOnce(&mut Card) -> Result<(), E>,
    ) -> Option<Result<Card, E>> {
        let user_id = *self.references.get(reference_id)?;
        let mut card = self.cards.get_mut(&user_id).filter(|card| card.reference_id == reference_id)?;
        Some(update(card.value_mut()).map(|()| card.value().clone()))
    }

    /// Overwrites the details of card `card_id` held by `user_id`.
    ///
    /// Returns `None` if `user_id` holds no card with that id.
    pub fn replace_details(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        details: CardDetails,
    ) -> Option<Result<Card, CardConflict>> {
        let mut card = self.cards.get_mut(&user_id).filter(|card| card.id == card_id)?;

        if card.reference_id != details.reference_id {
            match self.references.entry(details.reference_id.clone()) {
                Entry::Occupied(_) => return Some(Err(CardConflict::ReferenceTaken)),
                Entry::Vacant(reference) => {
                    reference.insert(user_id);
                }
            }
            self.references.remove(&card.reference_id);
        }

        let card = card.value_mut();
        card.real_pan = details.card_number;
        card.real_exp_date = details.expiry_date;
        card.reference_id = details.reference_id;
        card.updated_at = time::OffsetDateTime::now_utc();
        Some(Ok(card.clone()))
    }
}
