//! SQLite storage backend for cash cards.

use std::{
    path::Path,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use cashcard_core::{
    page, storage::require_owner, CardId, CashCard, CashCardStore, PageRequest, StorageError,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Ids beyond the SQLite rowid range cannot exist in the table.
fn to_row_id(id: CardId) -> Option<i64> {
    i64::try_from(id).ok()
}

fn sql_err(e: rusqlite::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn decode_card(id: i64, amount: String, owner: String) -> Result<CashCard, StorageError> {
    let id = id as CardId;
    let amount = Decimal::from_str(&amount)
        .map_err(|_| StorageError::InvalidAmount { id, value: amount.clone() })?;
    Ok(CashCard::new(id, amount, owner))
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)
        }
        .map_err(sql_err)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(sql_err)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cash_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                owner TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cash_cards_owner
                ON cash_cards(owner);
            ",
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Other("sqlite connection lock poisoned".to_string()))
    }
}

impl CashCardStore for SqliteStore {
    fn create(&self, amount: Decimal, owner: &str) -> Result<CashCard, StorageError> {
        require_owner(owner)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cash_cards (amount, owner) VALUES (?1, ?2)",
            params![amount.to_string(), owner],
        )
        .map_err(sql_err)?;
        let id = conn.last_insert_rowid() as CardId;
        tracing::debug!(id, owner, "SQLite card created");
        Ok(CashCard::new(id, amount, owner))
    }

    fn get_for_owner(&self, id: CardId, owner: &str) -> Result<Option<CashCard>, StorageError> {
        let Some(row_id) = to_row_id(id) else {
            return Ok(None);
        };
        let conn = self.lock()?;
        let row: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT id, amount, owner FROM cash_cards WHERE id = ?1 AND owner = ?2",
                params![row_id, owner],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(sql_err)?;
        row.map(|(id, amount, owner)| decode_card(id, amount, owner))
            .transpose()
    }

    fn list_for_owner(
        &self,
        owner: &str,
        page: &PageRequest,
    ) -> Result<Vec<CashCard>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, amount, owner FROM cash_cards WHERE owner = ?1")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![owner], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(sql_err)?;

        let mut owned = Vec::new();
        for row in rows {
            let (id, amount, owner) = row.map_err(sql_err)?;
            owned.push(decode_card(id, amount, owner)?);
        }
        // Amounts are stored as decimal text, so ordering happens in Rust.
        Ok(page::paginate(owned, page))
    }

    fn update_amount(
        &self,
        id: CardId,
        owner: &str,
        amount: Decimal,
    ) -> Result<Option<CashCard>, StorageError> {
        let Some(row_id) = to_row_id(id) else {
            return Ok(None);
        };
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE cash_cards SET amount = ?1 WHERE id = ?2 AND owner = ?3",
                params![amount.to_string(), row_id, owner],
            )
            .map_err(sql_err)?;
        if changed == 0 {
            return Ok(None);
        }
        tracing::debug!(id, owner, "SQLite card amount updated");
        Ok(Some(CashCard::new(id, amount, owner)))
    }

    fn exists_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError> {
        let Some(row_id) = to_row_id(id) else {
            return Ok(false);
        };
        let conn = self.lock()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM cash_cards WHERE id = ?1 AND owner = ?2)",
            params![row_id, owner],
            |row| row.get(0),
        )
        .map_err(sql_err)
    }

    fn delete_for_owner(&self, id: CardId, owner: &str) -> Result<bool, StorageError> {
        let Some(row_id) = to_row_id(id) else {
            return Ok(false);
        };
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM cash_cards WHERE id = ?1 AND owner = ?2",
                params![row_id, owner],
            )
            .map_err(sql_err)?;
        if removed > 0 {
            tracing::debug!(id, owner, "SQLite card deleted");
        }
        Ok(removed > 0)
    }

    fn count_for_owner(&self, owner: &str) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM cash_cards WHERE owner = ?1",
                params![owner],
                |row| row.get(0),
            )
            .map_err(sql_err)?;
        Ok(count as usize)
    }
}
