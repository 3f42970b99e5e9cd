//! HTTP route handlers.

pub mod analytics;
pub mod auth;
pub mod feature_flags;
pub mod health;
pub mod product_approval;
pub mod products;
