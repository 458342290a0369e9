use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for user records. Only rows with `active = true` are
/// visible to reads, except for the email lookup used by the uniqueness check.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_active(&self) -> StoreResult<Vec<User>>;
    async fn find_active(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    async fn update_active(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;
    async fn deactivate(&self, id: Uuid) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list_active(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, active, created_at, updated_at, deleted_at
            FROM users
            WHERE active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_active(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, active, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, active, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, age, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, name, email, age, active, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.age)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn update_active(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   age = COALESCE($4, age),
                   active = COALESCE($5, active),
                   deleted_at = CASE WHEN $5 = FALSE THEN now() ELSE deleted_at END,
                   updated_at = now()
             WHERE id = $1 AND active = TRUE
            RETURNING id, name, email, age, active, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.age)
        .bind(changes.active)
        .fetch_optional(&self.db)
        .await?;
        Ok(updated)
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET active = FALSE, deleted_at = now(), updated_at = now()
             WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
