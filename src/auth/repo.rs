use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Persistent user records. Email uniqueness is the only constraint and is
/// left to the storage engine.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        created_at: OffsetDateTime,
    ) -> Result<i64, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        created_at: OffsetDateTime,
    ) -> Result<i64, StoreError> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_pool;

    async fn store() -> SqliteUserStore {
        SqliteUserStore::new(test_pool().await)
    }

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        let id = store
            .create_user("Ada", "ada@example.com", "$argon2id$fake", now)
            .await
            .expect("insert user");
        assert!(id > 0);

        let by_email = store.find_by_email("ada@example.com").await.expect("by email");
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.name, "Ada");
        assert_eq!(by_email.password_hash, "$argon2id$fake");
        assert_eq!(by_email.created_at.unix_timestamp(), now.unix_timestamp());

        let by_id = store.find_by_id(id).await.expect("by id");
        assert_eq!(by_id.email, "ada@example.com");
    }

    #[tokio::test]
    async fn ids_are_distinct_and_increasing() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        let first = store.create_user("A", "a@example.com", "h", now).await.unwrap();
        let second = store.create_user("B", "b@example.com", "h", now).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        store
            .create_user("First", "dup@example.com", "h1", now)
            .await
            .expect("first insert");

        let err = store
            .create_user("Second", "dup@example.com", "h2", now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let kept = store.find_by_email("dup@example.com").await.unwrap();
        assert_eq!(kept.name, "First");
    }

    #[tokio::test]
    async fn duplicate_check_ignores_case() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        store.create_user("A", "case@example.com", "h", now).await.unwrap();
        let err = store
            .create_user("B", "CASE@example.com", "h", now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn concurrent_registrations_yield_one_winner() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        let (a, b) = tokio::join!(
            store.create_user("A", "race@example.com", "h", now),
            store.create_user("B", "race@example.com", "h", now),
        );

        let outcomes = [a, b];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let dupes = outcomes
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateEmail)))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(dupes, 1);
    }

    #[tokio::test]
    async fn missing_users_are_not_found() {
        let store = store().await;
        assert!(matches!(
            store.find_by_email("nobody@example.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.find_by_id(42).await, Err(StoreError::NotFound)));
    }
}
