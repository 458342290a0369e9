use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::{StoreError, UserRepository};
use super::repo_types::{NewUser, User, UserChanges};
use crate::error::FieldError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("email already registered")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(constraint) => {
                warn!(%constraint, "unique constraint hit");
                UserError::Conflict
            }
            StoreError::Database(e) => {
                error!(error = %e, "storage failure");
                UserError::Internal(e.into())
            }
        }
    }
}

pub type UserResult<T> = Result<T, UserError>;

/// Business rules for the user entity on top of an injected repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> UserResult<Vec<User>> {
        Ok(self.repo.list_active().await?)
    }

    /// Soft-deleted and never-existing ids are both `NotFound`.
    pub async fn get(&self, id: Uuid) -> UserResult<User> {
        self.repo.find_active(id).await?.ok_or(UserError::NotFound)
    }

    pub async fn create(&self, input: NewUser) -> UserResult<User> {
        self.ensure_email_free(&input.email).await?;
        let user = self.repo.insert(input).await?;
        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> UserResult<User> {
        let current = self.get(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }
        if let Some(email) = &changes.email {
            if *email != current.email {
                self.ensure_email_free(email).await?;
            }
        }
        // the row may have been deactivated since the lookup
        let user = self
            .repo
            .update_active(id, changes)
            .await?
            .ok_or(UserError::NotFound)?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Irreversible through the API; a second call on the same id is `NotFound`.
    pub async fn delete(&self, id: Uuid) -> UserResult<()> {
        if !self.repo.deactivate(id).await? {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "user deactivated");
        Ok(())
    }

    /// Any stored record holding the email blocks it, inactive ones included.
    /// The unique index stays the final arbiter under concurrent writes.
    async fn ensure_email_free(&self, email: &str) -> UserResult<()> {
        if self.repo.find_by_email(email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(UserError::Conflict);
        }
        Ok(())
    }
}
