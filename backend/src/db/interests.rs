use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{canonical_pair, InterestKind, Match};
use crate::services::gateway::{InterestStore, StoreError};

/// Postgres implementation of the persistence gateway. Idempotency comes
/// from the unique indexes: `ON CONFLICT DO NOTHING` on both writes.
#[derive(Debug, Clone)]
pub struct PgInterestStore {
    pool: PgPool,
}

impl PgInterestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestStore for PgInterestStore {
    async fn create_interest(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        kind: InterestKind,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO interests (from_user_id, to_user_id, kind)
            VALUES ($1, $2, $3)
            ON CONFLICT (from_user_id, to_user_id, kind) DO NOTHING
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn interest_exists(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM interests
                WHERE from_user_id = $1 AND to_user_id = $2 AND kind <> 'pass'
            )
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn delete_interest(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM interests
            WHERE from_user_id = $1 AND to_user_id = $2 AND kind <> 'pass'
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_match(&self, user_1: &str, user_2: &str) -> Result<Option<Match>, StoreError> {
        let (user_a, user_b) = canonical_pair(user_1, user_2);

        let existing = sqlx::query_as::<_, Match>(
            r#"
            SELECT id, user_a, user_b, created_at
            FROM matches
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn create_match(&self, user_1: &str, user_2: &str) -> Result<Match, StoreError> {
        let (user_a, user_b) = canonical_pair(user_1, user_2);

        // Two callers may race this from both sides of the pair; the unique
        // index on (user_a, user_b) makes the second insert a no-op and the
        // read-back returns the single surviving row either way.
        sqlx::query(
            r#"
            INSERT INTO matches (user_a, user_b)
            VALUES ($1, $2)
            ON CONFLICT (user_a, user_b) DO NOTHING
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await?;

        let created = sqlx::query_as::<_, Match>(
            r#"
            SELECT id, user_a, user_b, created_at
            FROM matches
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
