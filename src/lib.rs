//! Cash card service: owner-scoped card balances behind an HTTP API.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
