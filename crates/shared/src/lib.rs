//! Shared utilities and common types for the Sharoushi office backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Session token verification (HS256 JWT)
//! - Offset pagination parameters and envelopes
//! - Common validation and date parsing logic

pub mod jwt;
pub mod pagination;
pub mod validation;
