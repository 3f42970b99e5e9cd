//! Password reset token repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::PasswordResetEntity;
use crate::metrics::QueryTimer;

/// Repository for password reset tokens.
#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: PgPool,
}

impl PasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a new reset token digest for a user.
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_password_reset");
        let result = sqlx::query_as::<_, PasswordResetEntity>(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, used_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an unexpired, unused token by its digest.
    pub async fn find_valid(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_valid_password_reset");
        let result = sqlx::query_as::<_, PasswordResetEntity>(
            r#"
            SELECT id, user_id, token_hash, expires_at, used_at, created_at
            FROM password_resets
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark a token as consumed. Conditional on it being unused so a token
    /// cannot be redeemed twice.
    pub async fn mark_used(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_password_reset_used");
        let result = sqlx::query(
            r#"
            UPDATE password_resets
            SET used_at = NOW()
            WHERE id = $1 AND used_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected() > 0);
        timer.record();
        result
    }
}
