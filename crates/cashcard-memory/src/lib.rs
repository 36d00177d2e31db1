//! In-memory storage backend for cash cards.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use rust_decimal::Decimal;

use cashcard_core::{
    page, storage::require_owner, CardId, CashCard, CashCardStore, PageRequest, StorageError,
};

pub struct InMemoryStore {
    cards: RwLock<BTreeMap<CardId, CashCard>>,
    sequence_counter: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(BTreeMap::new()),
            sequence_counter: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> CardId {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<CardId, CashCard>>, StorageError> {
        self.cards
            .read()
            .map_err(|_| StorageError::Other("card map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<CardId, CashCard>>, StorageError> {
        self.cards
            .write()
            .map_err(|_| StorageError::Other("card map lock poisoned".to_string()))
    }
}

impl CashCardStore for InMemoryStore {
    fn create(&self, amount: Decimal, owner: &str) -> Result<CashCard, StorageError> {
        require_owner(owner)?;
        let card = CashCard::new(self.next_id(), amount, owner);
        self.write()?.insert(card.id, card.clone());
        tracing::debug!(id = card.id, owner, "Card created");
        Ok(card)
    }

    fn get_for_owner(&self, id: CardId, owner: &str) -> Result<Option<CashCard>, StorageError> {
        Ok(self.read()?
            .get(&id)
            .filter(|c| c.is_owned_by(owner))
            .cloned())
    }

    fn list_for_owner(
        &self,
        owner: &str,
        page: &PageRequest,
    ) -> Result<Vec<CashCard>, StorageError> {
        let owned: Vec<CashCard> = self.read()?
            .values()
            .filter(|c| c.is_owned_by(owner))
            .cloned()
            .collect();
        Ok(page::paginate(owned, page))
    }

    fn update_amount(
        &self,
        id: CardId,
        owner: &str,
        amount: Decimal,
    ) -> Result<Option<CashCard>, StorageError> {
        let mut cards = self.write()?;
        match cards.get_mut(&id).filter(|c| c.is_owned_by(owner)) {
            Some(card) => {
                card.amount = amount;
                tracing::debug!(id, owner, "Card amount updated");
                Ok(Some(card.clone()))
            }
            None => Ok(None),
        }
    }

    fn exists_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError> {
        Ok(self.read()?.get(&id).is_some_and(|c| c.is_owned_by(owner)))
    }

    fn delete_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError> {
        let mut cards = self.write()?;
        if !cards.get(&id).is_some_and(|c| c.is_owned_by(owner)) {
            return Ok(false);
        }
        cards.remove(&id);
        tracing::debug!(id, owner, "Card deleted");
        Ok(true)
    }

    fn count_for_owner(&self, owner: &str) -> Result<usize, StorageError> {
        Ok(self.read()?.values().filter(|c| c.is_owned_by(owner)).count())
    }
}
