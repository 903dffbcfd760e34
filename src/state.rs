use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{Argon2Hasher, PasswordHasher};
use crate::auth::services::AuthService;
use crate::config::AppConfig;
use crate::db;
use crate::users::memory::InMemoryUserStore;
use crate::users::repo::{PgUserStore, UserStore};
use crate::users::services::UserService;

/// `DATABASE_URL` value that selects the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Opens the configured store (running migrations for Postgres) and wires
    /// the services around it.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = if config.database_url == MEMORY_DATABASE_URL {
            warn!("using in-memory user store; data is lost on exit");
            Arc::new(InMemoryUserStore::new())
        } else {
            let pool = db::connect(&config.database_url).await?;
            db::migrate(&pool).await;
            Arc::new(PgUserStore::new(pool))
        };
        Self::from_parts(Arc::new(config), store)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new(&config.hashing)?) as Arc<dyn PasswordHasher>;
        let keys = JwtKeys::new(&config.jwt);
        let auth = Arc::new(AuthService::new(store.clone(), hasher.clone(), keys));
        let users = Arc::new(UserService::new(store, hasher));
        Ok(Self {
            config,
            auth,
            users,
            started_at: OffsetDateTime::now_utc(),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let store = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
        Self::from_parts(Arc::new(AppConfig::for_tests()), store).expect("test config is valid")
    }
}
