pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod feature_flags;
pub mod middleware;
pub mod routes;
pub mod services;
