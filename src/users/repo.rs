use std::cmp::Ordering;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{Role, User, UserRow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Listing query. Ties on the sort key are broken by `id` ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub sort_by: SortBy,
    pub order: SortOrder,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |r| user.role == r)
    }

    /// Ordering used by every store implementation.
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        let primary = match self.sort_by {
            SortBy::Name => a.name.cmp(&b.name),
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already in use")]
    DuplicateEmail,

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator for user records.
///
/// Implementations must enforce email uniqueness themselves: the services'
/// existence checks are read-then-write and can race.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert(&self, user: User) -> StoreResult<User>;

    /// Replace the profile columns of an existing record. `last_login_at` is
    /// left as stored; only `record_login` writes it.
    async fn save(&self, user: User) -> StoreResult<User>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn query_filtered(&self, filter: UserFilter) -> StoreResult<Vec<User>>;

    /// Users whose last login is before `cutoff` or who never logged in,
    /// ordered by `created_at` then `id`.
    async fn query_older_than_or_null(&self, cutoff: OffsetDateTime) -> StoreResult<Vec<User>>;

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()>;
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, last_login_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        // 23505 = unique_violation
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Other(anyhow::Error::new(e).context("write user"))
}

fn into_users(rows: Vec<UserRow>) -> StoreResult<Vec<User>> {
    rows.into_iter()
        .map(|r| User::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(User::try_from(row)?)
    }

    async fn save(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4, role = $5, updated_at = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_error)?
        .ok_or(StoreError::NotFound(user.id))?;
        Ok(User::try_from(row)?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn query_filtered(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let column = match filter.sort_by {
            SortBy::Name => "name",
            SortBy::CreatedAt => "created_at",
        };
        let direction = match filter.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE ($1::text IS NULL OR role = $1)
             ORDER BY {column} {direction}, id ASC
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(filter.role.map(|r| r.as_str()))
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        into_users(rows)
    }

    async fn query_older_than_or_null(&self, cutoff: OffsetDateTime) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE last_login_at IS NULL OR last_login_at < $1
             ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.db)
        .await
        .context("list inactive users")?;
        into_users(rows)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await
            .context("record login")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user(name: &str, role: Role, age_secs: i64) -> User {
        let mut u = User::new(name.into(), format!("{name}@example.com"), "h".into(), role);
        u.created_at -= Duration::seconds(age_secs);
        u
    }

    #[test]
    fn filter_matches_exact_role_only() {
        let admins = UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert!(admins.matches(&user("a", Role::Admin, 0)));
        assert!(!admins.matches(&user("b", Role::User, 0)));
        assert!(UserFilter::default().matches(&user("c", Role::User, 0)));
    }

    #[test]
    fn compare_orders_by_key_then_id() {
        let mut a = user("same", Role::User, 10);
        let mut b = user("same", Role::User, 20);
        if a.id > b.id {
            std::mem::swap(&mut a.id, &mut b.id);
        }

        let by_name_desc = UserFilter {
            order: SortOrder::Desc,
            ..Default::default()
        };
        // equal names: id ascending regardless of direction
        assert_eq!(by_name_desc.compare(&a, &b), Ordering::Less);

        let by_created = UserFilter {
            sort_by: SortBy::CreatedAt,
            ..Default::default()
        };
        // b is older
        assert_eq!(by_created.compare(&a, &b), Ordering::Greater);
    }
}
