//! Domain layer for the Sharoushi office backend.
//!
//! This crate contains:
//! - Domain models (Client, Task, Subsidy, SubsidyApplication, ...)
//! - Business rules: the subsidy application lifecycle, calendar sync
//!   payload mapping, and notification composition

pub mod models;
pub mod services;
