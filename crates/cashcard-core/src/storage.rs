use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{CardId, CashCard};
use crate::page::PageRequest;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
    #[error("invalid stored amount for card {id}: {value}")]
    InvalidAmount { id: CardId, value: String },
    #[error("card owner must not be empty")]
    EmptyOwner,
}

/// Checks the owner a new card is about to be bound to.
pub fn require_owner(owner: &str) -> Result<(), StorageError> {
    if owner.trim().is_empty() {
        return Err(StorageError::EmptyOwner);
    }
    Ok(())
}

/// Owner-scoped storage for cash cards.
///
/// Every read and write takes the owner explicitly. A card that does not
/// exist and a card that belongs to someone else are reported the same way
/// (`None` / `false`), so callers cannot discover other owners' ids.
pub trait CashCardStore: Send + Sync {
    /// Persists a new card with a freshly assigned id. Fails with
    /// [`StorageError::EmptyOwner`] for a blank owner.
    fn create(&self, amount: Decimal, owner: &str) -> Result<CashCard, StorageError>;

    fn get_for_owner(&self, id: CardId, owner: &str) -> Result<Option<CashCard>, StorageError>;

    /// Returns the owner's cards, sorted and windowed per `page`.
    fn list_for_owner(
        &self,
        owner: &str,
        page: &PageRequest,
    ) -> Result<Vec<CashCard>, StorageError>;

    /// Replaces the amount of an owned card. `id` and `owner` are untouched.
    fn update_amount(
        &self,
        id: CardId,
        owner: &str,
        amount: Decimal,
    ) -> Result<Option<CashCard>, StorageError>;

    fn exists_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError>;

    /// Removes the card if, and only if, it is owned by `owner`. The ownership
    /// check and the removal happen as one step.
    fn delete_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError>;

    fn count_for_owner(&self, owner: &str) -> Result<usize, StorageError>;
}
