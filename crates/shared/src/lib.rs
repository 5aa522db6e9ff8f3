//! Shared error codes, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Business error codes with stable user-facing descriptions
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, LockBackendKind, LockConfig};
pub use error::{AppError, ErrorCode};
