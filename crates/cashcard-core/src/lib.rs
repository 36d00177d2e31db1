//! Core types and traits for cash card storage backends.
//!
//! This crate provides the `CashCardStore` trait, the `CashCard` record and
//! the pagination engine shared by every backend, so storage implementations
//! can live in separate crates.

pub mod models;
pub mod page;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{CardId, CashCard};
pub use page::{
    Direction, Order, PageError, PageRequest, Sort, SortKey, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use storage::{CashCardStore, StorageError};
