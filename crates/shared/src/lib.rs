//! Shared utilities and common types for the storefront backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT token generation and validation
//! - Password hashing with Argon2id
//! - Opaque token generation and hashing (password resets)
//! - Offset pagination helpers
//! - Common validation logic

pub mod jwt;
pub mod pagination;
pub mod password;
pub mod tokens;
pub mod validation;
