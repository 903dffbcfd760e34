use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::password::PasswordHasher;
use crate::error::{AppError, AppResult};
use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{Role, User};
use crate::users::services::internal;

/// Identity service: credential checks, token issuance and resolution.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>, keys: JwtKeys) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    /// Returns the refreshed record and a signed token.
    ///
    /// The login timestamp is written after the lookup without a transaction;
    /// concurrent logins may overwrite each other's timestamp.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let mut user = match self.store.find_by_email(email).await.map_err(internal)? {
            Some(u) => u,
            None => {
                warn!("login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        self.store.record_login(user.id, now).await.map_err(internal)?;
        user.last_login_at = Some(now);

        let token = self.keys.sign(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }

    pub async fn resolve_token(&self, token: &str) -> AppResult<User> {
        let claims = self.keys.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            AppError::InvalidToken
        })?;
        match self.store.find_by_id(claims.sub).await.map_err(internal)? {
            Some(u) => Ok(u),
            None => {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                Err(AppError::InvalidToken)
            }
        }
    }

    /// Public self-registration; the role is always `user`.
    #[instrument(skip(self, name, password))]
    pub async fn register(&self, name: String, email: String, password: &str) -> AppResult<User> {
        if self.store.find_by_email(&email).await.map_err(internal)?.is_some() {
            warn!("email already registered");
            return Err(AppError::conflict("email already in use"));
        }

        let hash = self.hasher.hash(password)?;
        let user = self
            .store
            .insert(User::new(name, email, hash, Role::User))
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => AppError::conflict("email already in use"),
                other => internal(other),
            })?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::users::memory::InMemoryUserStore;
    use crate::users::services::tests::{cheap_hasher, RacingStore};

    fn service() -> (AuthService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let keys = JwtKeys::new(&AppConfig::for_tests().jwt);
        (AuthService::new(store.clone(), cheap_hasher(), keys), store)
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let (svc, _) = service();
        let user = svc
            .register("Maria".into(), "maria@example.com".into(), "senha123")
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.last_login_at.is_none());

        let (logged_in, token) = svc.authenticate("maria@example.com", "senha123").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(logged_in.last_login_at.is_some());

        let resolved = svc.resolve_token(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(resolved.last_login_at.is_some());
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let (svc, _) = service();
        svc.register("A".into(), "taken@example.com".into(), "senha123").await.unwrap();
        let err = svc
            .register("B".into(), "taken@example.com".into(), "outra123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_fails_without_touching_last_login() {
        let (svc, store) = service();
        let user = svc.register("A".into(), "a@example.com".into(), "senha123").await.unwrap();

        let err = svc.authenticate("a@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_none());
    }

    #[tokio::test]
    async fn unknown_email_is_invalid_credentials() {
        let (svc, _) = service();
        let err = svc.authenticate("nobody@example.com", "whatever").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn token_for_removed_user_is_invalid() {
        let (svc, store) = service();
        let user = svc.register("A".into(), "a@example.com".into(), "senha123").await.unwrap();
        let (_, token) = svc.authenticate("a@example.com", "senha123").await.unwrap();
        store.delete(user.id).await.unwrap();

        let err = svc.resolve_token(&token).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (svc, _) = service();
        let err = svc.resolve_token("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn duplicate_caught_by_the_store_is_a_conflict() {
        let store = Arc::new(RacingStore::missing_email_lookups());
        let keys = JwtKeys::new(&AppConfig::for_tests().jwt);
        let svc = AuthService::new(store.clone(), cheap_hasher(), keys);
        svc.register("A".into(), "taken@example.com".into(), "senha123").await.unwrap();

        let err = svc
            .register("B".into(), "taken@example.com".into(), "outra123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let users = store.inner.query_filtered(Default::default()).await.unwrap();
        assert_eq!(users.len(), 1);
    }
}
