use crate::domain::card::{Card, CardSecrets};
use crate::storage::card_repo::CardDetails;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateCard {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadCard {
    pub reference_id: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCard {
    pub card_number: String,
    pub expiry_date: String,
    pub reference_id: String,
}

impl From<UpdateCard> for CardDetails {
    fn from(update: UpdateCard) -> Self {
        Self { card_number: update.card_number, expiry_date: update.expiry_date, reference_id: update.reference_id }
    }
}

#[derive(Debug, Deserialize)]
pub struct Reveal {
    #[serde(default)]
    pub verification_token: Option<String>,
}

/// Card as shown before step-up verification.
#[derive(Debug, Serialize)]
pub struct CardView {
    pub id: Uuid,
    pub reference_id: String,
    pub name_on_card: String,
    pub card_number: String,
    pub expiry_date: String,
    pub balance: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Card> for CardView {
    fn from(card: Card) -> Self {
        Self {
            card_number: card.masked_pan(),
            expiry_date: card.masked_exp_date(),
            id: card.id,
            reference_id: card.reference_id,
            name_on_card: card.name_on_card,
            balance: card.balance,
            created_at: card.created_at.unix_timestamp(),
            updated_at: card.updated_at.unix_timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevealedCard {
    pub name_on_card: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl From<CardSecrets> for RevealedCard {
    fn from(secrets: CardSecrets) -> Self {
        Self {
            name_on_card: secrets.name_on_card,
            card_number: secrets.card_number,
            expiry_date: secrets.expiry_date,
            cvv: secrets.cvv,
        }
    }
}
