//! Ordering and windowing over an owner's cards.
//!
//! Every backend funnels its owner-scoped result set through [`paginate`] so
//! that the ordering rules live in one place: apply the requested orders left
//! to right, then break remaining ties by `id` ascending.

use std::{cmp::Ordering, fmt, str::FromStr};

use thiserror::Error;

use crate::models::CashCard;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 2000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("unknown sort property: {0}")]
    UnknownSortKey(String),
    #[error("unknown sort direction: {0}")]
    UnknownDirection(String),
    #[error("malformed sort expression: {0}")]
    MalformedSort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Id,
    #[default]
    Amount,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One property and the direction to order it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Order {
    pub key: SortKey,
    pub direction: Direction,
}

impl Order {
    pub fn new(key: SortKey, direction: Direction) -> Self {
        Self { key, direction }
    }

    fn compare(&self, a: &CashCard, b: &CashCard) -> Ordering {
        let ordering = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Amount => a.amount.cmp(&b.amount),
            SortKey::Owner => a.owner.cmp(&b.owner),
        };
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Sort order. Defaults to `amount` ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Default for Sort {
    fn default() -> Self {
        Self::new(SortKey::Amount, Direction::Asc)
    }
}

impl Sort {
    pub fn new(key: SortKey, direction: Direction) -> Self {
        Self {
            orders: vec![Order::new(key, direction)],
        }
    }

    /// Adds a lower-priority order, consulted when all earlier ones tie.
    pub fn then(mut self, key: SortKey, direction: Direction) -> Self {
        self.orders.push(Order::new(key, direction));
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Combines repeated `sort` query values in the order given. Blank values
    /// are skipped; with nothing left the default order applies.
    pub fn from_params<S: AsRef<str>>(params: &[S]) -> Result<Self, PageError> {
        let mut orders = Vec::new();
        for param in params.iter().map(AsRef::as_ref) {
            if param.trim().is_empty() {
                continue;
            }
            orders.extend(param.parse::<Sort>()?.orders);
        }
        if orders.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { orders })
    }

    fn compare(&self, a: &CashCard, b: &CashCard) -> Ordering {
        self.orders
            .iter()
            .fold(Ordering::Equal, |acc, order| acc.then_with(|| order.compare(a, b)))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for SortKey {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortKey::Id),
            "amount" => Ok(SortKey::Amount),
            "owner" => Ok(SortKey::Owner),
            other => Err(PageError::UnknownSortKey(other.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(PageError::UnknownDirection(s.to_string())),
        }
    }
}

/// Parses a single `sort` value: `key`, `key,direction`, or several keys
/// sharing a trailing direction such as `amount,id,desc`.
impl FromStr for Sort {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(PageError::MalformedSort(s.to_string()));
        }

        let trailing = match parts.as_slice() {
            [_, .., last] => last.parse::<Direction>().ok(),
            _ => None,
        };
        let direction = match trailing {
            Some(direction) => {
                parts.pop();
                direction
            }
            None => Direction::Asc,
        };

        let orders = parts
            .into_iter()
            .map(|key| Ok(Order::new(key.parse()?, direction)))
            .collect::<Result<Vec<_>, PageError>>()?;
        Ok(Sort { orders })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Id => "id",
            SortKey::Amount => "amount",
            SortKey::Owner => "owner",
        };
        let direction = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{},{}", key, direction)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, order) in self.orders.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", order)?;
        }
        Ok(())
    }
}

/// A zero-based page of `size` cards under `sort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
    pub sort: Sort,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, size: usize, sort: Sort) -> Self {
        Self { page, size, sort }
    }

    /// Builds a request from raw query values.
    ///
    /// A `page` that is missing, negative or not a number means page 0. A
    /// `size` that is missing, zero or not a number means the default size,
    /// and oversized pages are clamped. Only an unknown sort property is an
    /// error.
    pub fn from_params<S: AsRef<str>>(
        page: Option<&str>,
        size: Option<&str>,
        sort: &[S],
    ) -> Result<Self, PageError> {
        let page = page.and_then(|p| p.trim().parse::<usize>().ok()).unwrap_or(0);
        let size = match size.and_then(|s| s.trim().parse::<usize>().ok()) {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(s) => s.min(MAX_PAGE_SIZE),
        };
        Ok(Self {
            page,
            size,
            sort: Sort::from_params(sort)?,
        })
    }

    /// Offset of the first card on this page, `None` if it overflows.
    pub fn offset(&self) -> Option<usize> {
        self.page.checked_mul(self.size)
    }
}

pub fn sort_cards(cards: &mut [CashCard], sort: &Sort) {
    cards.sort_by(|a, b| sort.compare(a, b));
}

/// Sorts `cards` and returns the requested window. Pages past the end come
/// back empty.
pub fn paginate(mut cards: Vec<CashCard>, request: &PageRequest) -> Vec<CashCard> {
    let offset = match request.offset() {
        Some(o) if o < cards.len() => o,
        _ => return Vec::new(),
    };
    sort_cards(&mut cards, &request.sort);
    cards.into_iter().skip(offset).take(request.size).collect()
}
