use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Primary key of a cash card. Unique across the whole store.
pub type CardId = u64;

/// A stored cash card.
///
/// `id` and `owner` are assigned by the store on creation and never change;
/// only `amount` is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashCard {
    pub id: CardId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub owner: String,
}

impl CashCard {
    pub fn new(id: CardId, amount: Decimal, owner: impl Into<String>) -> Self {
        Self {
            id,
            amount,
            owner: owner.into(),
        }
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner == owner
    }
}
