//! Core business logic for Tally.
//!
//! This crate contains the balance rules and the per-account locking policy
//! with no web or database dependencies. Persistence and transport live in
//! `tally-db` and `tally-api`.
//!
//! # Modules
//!
//! - `ledger` - Accounts, transaction records, use/cancel rules
//! - `lock` - Per-account mutual exclusion over a pluggable backend

pub mod ledger;
pub mod lock;
