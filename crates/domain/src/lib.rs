//! Domain layer for the storefront backend.
//!
//! This crate contains:
//! - Domain models (Product, User, revenue summaries)
//! - Request/response types for the HTTP API
//! - Domain-level validation rules

pub mod models;
