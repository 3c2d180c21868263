//! Shared types, errors, and configuration for Custodia.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for register listings
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, RegisterSettings};
pub use error::{AppError, AppResult};
