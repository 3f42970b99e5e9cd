//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRoleDb {
    Customer,
    Vendor,
    Superadmin,
}

impl UserRoleDb {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRoleDb::Customer => "customer",
            UserRoleDb::Vendor => "vendor",
            UserRoleDb::Superadmin => "superadmin",
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRoleDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_db_str_forms() {
        assert_eq!(UserRoleDb::Customer.as_str(), "customer");
        assert_eq!(UserRoleDb::Vendor.as_str(), "vendor");
        assert_eq!(UserRoleDb::Superadmin.as_str(), "superadmin");
    }
}
