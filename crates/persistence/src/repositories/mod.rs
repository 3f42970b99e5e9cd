//! Repository implementations.

pub mod order;
pub mod password_reset;
pub mod product;
pub mod user;

pub use order::OrderRepository;
pub use password_reset::PasswordResetRepository;
pub use product::ProductRepository;
pub use user::UserRepository;
