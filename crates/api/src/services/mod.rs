//! Application services.

pub mod email;

pub use email::{EmailMessage, EmailService};
