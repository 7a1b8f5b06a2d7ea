use time::OffsetDateTime;
use uuid::Uuid;

/// Offsets into the real card number that make up the CVV.
const CVV_OFFSETS: [usize; 3] = [3, 7, 11];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reference_id: String,
    pub name_on_card: String,
    pub(crate) real_pan: String,
    pub(crate) real_exp_date: String,
    pub balance: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The fields released only after step-up verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSecrets {
    pub name_on_card: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl Card {
    /// Card number with everything but the last four digits hidden.
    #[must_use]
    pub fn masked_pan(&self) -> String {
        let visible = self.real_pan.len().saturating_sub(4);
        let (hidden, last_four) = self.real_pan.split_at(visible);
        format!("{}{last_four}", "*".repeat(hidden.len()))
    }

    #[must_use]
    pub fn masked_exp_date(&self) -> String {
        self.real_exp_date.chars().map(|c| if c.is_ascii_digit() { '*' } else { c }).collect()
    }

    #[must_use]
    pub fn cvv(&self) -> String {
        let digits = self.real_pan.as_bytes();
        CVV_OFFSETS.iter().filter_map(|&i| digits.get(i)).map(|&b| char::from(b)).collect()
    }

    #[must_use]
    pub fn secrets(&self) -> CardSecrets {
        CardSecrets {
            name_on_card: self.name_on_card.clone(),
            card_number: self.real_pan.clone(),
            expiry_date: self.real_exp_date.clone(),
            cvv: self.cvv(),
        }
    }
}
