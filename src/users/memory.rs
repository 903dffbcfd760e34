use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::repo::{StoreError, StoreResult, UserFilter, UserStore};
use crate::users::repo_types::User;

/// In-memory `UserStore`, used by tests and local runs without Postgres.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, mut user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound(user.id));
        }
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound(user.id))?;
        user.last_login_at = stored.last_login_at;
        *stored = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn query_filtered(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut out: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        out.sort_by(|a, b| filter.compare(a, b));
        Ok(out)
    }

    async fn query_older_than_or_null(&self, cutoff: OffsetDateTime) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut out: Vec<User> = users
            .values()
            .filter(|u| u.last_login_at.map_or(true, |at| at < cutoff))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.last_login_at = Some(at);
        }
        Ok(())
    }
}
