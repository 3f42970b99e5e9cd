//! Entity definitions (database row mappings).

pub mod order;
pub mod password_reset;
pub mod product;
pub mod user;

pub use order::*;
pub use password_reset::*;
pub use product::*;
pub use user::*;
