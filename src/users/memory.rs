//! In-process `UserRepository` used by tests. Enforces the same unique
//! email index as the Postgres schema.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{StoreError, StoreResult, UserRepository};
use super::repo_types::{NewUser, User, UserChanges};

#[derive(Default)]
pub struct MemoryUserRepository {
    // insertion order doubles as creation order
    rows: Mutex<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row, inactive ones included.
    pub fn all(&self) -> Vec<User> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn email_taken(rows: &[User], email: &str, except: Option<Uuid>) -> bool {
    rows.iter()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn list_active(&self) -> StoreResult<Vec<User>> {
        Ok(self.lock().iter().rev().filter(|u| u.active).cloned().collect())
    }

    async fn find_active(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().iter().find(|u| u.id == id && u.active).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut rows = self.lock();
        if email_taken(&rows, &user.email, None) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            age: user.age,
            active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_active(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut rows = self.lock();
        if let Some(email) = &changes.email {
            if email_taken(&rows, email, Some(id)) {
                return Err(StoreError::UniqueViolation("users_email_key".into()));
            }
        }
        let Some(user) = rows.iter_mut().find(|u| u.id == id && u.active) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        if let Some(active) = changes.active {
            user.active = active;
            if !active {
                user.deleted_at = Some(now);
            }
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<bool> {
        let mut rows = self.lock();
        let Some(user) = rows.iter_mut().find(|u| u.id == id && u.active) else {
            return Ok(false);
        };
        let now = OffsetDateTime::now_utc();
        user.active = false;
        user.deleted_at = Some(now);
        user.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana Silva".into(),
            email: email.into(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email_even_when_inactive() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user("ana@example.com")).await.unwrap();
        assert!(repo.deactivate(user.id).await.unwrap());

        let err = repo.insert(new_user("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(repo.all().len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_skips_inactive() {
        let repo = MemoryUserRepository::new();
        let a = repo.insert(new_user("a@example.com")).await.unwrap();
        let b = repo.insert(new_user("b@example.com")).await.unwrap();
        let c = repo.insert(new_user("c@example.com")).await.unwrap();
        repo.deactivate(b.id).await.unwrap();

        let ids: Vec<Uuid> = repo.list_active().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
    }

    #[tokio::test]
    async fn deactivate_stamps_deleted_at_once() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user("a@example.com")).await.unwrap();
        assert!(repo.deactivate(user.id).await.unwrap());
        assert!(!repo.deactivate(user.id).await.unwrap());

        let stored = &repo.all()[0];
        assert!(!stored.active);
        assert!(stored.deleted_at.is_some());
    }
}
