//! Persistence layer for the Sharoushi office backend.
//!
//! This crate contains:
//! - SQLite pool management and embedded migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use sqlx::SqlitePool;
