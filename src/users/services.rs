use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::error::{AppError, AppResult};
use crate::users::dto::{AdminEditRequest, CreateUserRequest, UpdateUserRequest};
use crate::users::policy::{self, Requester};
use crate::users::repo::{StoreError, UserFilter, UserStore};
use crate::users::repo_types::{Role, User};

/// Users who have not logged in for this long are inactive.
pub const INACTIVITY_THRESHOLD: Duration = Duration::days(30);

/// User mutation policy engine: authorizes and applies changes to user records.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    async fn load(&self, id: Uuid) -> AppResult<User> {
        self.store
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// Admin-initiated creation; role defaults to `user`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: CreateUserRequest) -> AppResult<User> {
        if self.store.find_by_email(&input.email).await.map_err(internal)?.is_some() {
            warn!("email already in use");
            return Err(AppError::conflict("email already in use"));
        }
        let hash = self.hasher.hash(&input.password)?;
        let user = User::new(input.name, input.email, hash, input.role.unwrap_or(Role::User));
        let created = self.store.insert(user).await.map_err(|e| match e {
            StoreError::DuplicateEmail => AppError::conflict("email already in use"),
            other => internal(other),
        })?;
        info!(user_id = %created.id, role = %created.role, "user created");
        Ok(created)
    }

    pub async fn find_by_id(&self, target_id: Uuid, requester: &Requester) -> AppResult<User> {
        let user = self.load(target_id).await?;
        if !policy::can_view(requester, target_id) {
            warn!(requester = %requester.id, %target_id, "view denied");
            return Err(AppError::forbidden("access denied"));
        }
        Ok(user)
    }

    pub async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.store.find_by_email(email).await.map_err(internal)?.is_some())
    }

    pub async fn list_users(&self, filter: UserFilter) -> AppResult<Vec<User>> {
        self.store.query_filtered(filter).await.map_err(internal)
    }

    /// Users who never logged in or whose last login predates the threshold.
    pub async fn list_inactive(&self) -> AppResult<Vec<User>> {
        let cutoff = OffsetDateTime::now_utc() - INACTIVITY_THRESHOLD;
        self.store
            .query_older_than_or_null(cutoff)
            .await
            .map_err(internal)
    }

    /// Partial update through the self-service path. First failing rule wins:
    /// missing target, foreign target, missing or wrong current password,
    /// role change by a non-admin.
    #[instrument(skip(self, requester, change), fields(requester = %requester.id))]
    pub async fn self_or_admin_update(
        &self,
        target_id: Uuid,
        requester: &Requester,
        change: UpdateUserRequest,
    ) -> AppResult<User> {
        let mut user = self.load(target_id).await?;

        if !policy::can_modify(requester, target_id) {
            warn!("attempt to modify another profile");
            return Err(AppError::forbidden("you may only modify your own profile"));
        }

        if change.password.is_some() && policy::requires_current_password(requester, target_id) {
            let current = change
                .current_password
                .as_deref()
                .ok_or_else(|| AppError::bad_request("current password is required"))?;
            if !self.hasher.verify(current, &user.password_hash)? {
                warn!("wrong current password");
                return Err(AppError::bad_request("current password is incorrect"));
            }
        }

        if change.role.is_some() && !policy::can_change_role(requester) {
            warn!("non-admin role change attempt");
            return Err(AppError::forbidden("only administrators may change roles"));
        }

        let UpdateUserRequest {
            name,
            password,
            current_password: _,
            role,
        } = change;
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(password) = password {
            user.password_hash = self.hasher.hash(&password)?;
        }
        user.updated_at = OffsetDateTime::now_utc();

        let saved = self.store.save(user).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::not_found("user not found"),
            other => internal(other),
        })?;
        info!(user_id = %saved.id, "user updated");
        Ok(saved)
    }

    /// Elevated edit: any field of any record, email included. Routes guard it
    /// with `AdminUser`; the requester is checked again here.
    #[instrument(skip(self, requester, change), fields(requester = %requester.id))]
    pub async fn admin_elevated_edit(
        &self,
        target_id: Uuid,
        requester: &Requester,
        change: AdminEditRequest,
    ) -> AppResult<User> {
        if !policy::can_change_email(requester) {
            warn!("elevated edit denied");
            return Err(AppError::forbidden("access denied"));
        }
        let mut user = self.load(target_id).await?;

        if let Some(email) = change.email.as_deref() {
            if email != user.email
                && self.store.find_by_email(email).await.map_err(internal)?.is_some()
            {
                warn!(email, "email already in use");
                return Err(AppError::bad_request("email already in use"));
            }
        }

        if let Some(name) = change.name {
            user.name = name;
        }
        if let Some(email) = change.email {
            user.email = email;
        }
        if let Some(role) = change.role {
            user.role = role;
        }
        if let Some(password) = change.password {
            user.password_hash = self.hasher.hash(&password)?;
        }
        user.updated_at = OffsetDateTime::now_utc();

        let saved = self.store.save(user).await.map_err(|e| match e {
            StoreError::DuplicateEmail => AppError::bad_request("email already in use"),
            StoreError::NotFound(_) => AppError::not_found("user not found"),
            other => internal(other),
        })?;
        info!(user_id = %saved.id, "user edited by admin");
        Ok(saved)
    }

    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn remove(&self, target_id: Uuid, requester: &Requester) -> AppResult<()> {
        if !policy::can_remove_users(requester) {
            warn!("non-admin removal attempt");
            return Err(AppError::forbidden("only administrators may remove users"));
        }
        if policy::is_self(requester, target_id) {
            return Err(AppError::bad_request("you cannot remove your own account"));
        }
        let user = self.load(target_id).await?;
        if !self.store.delete(user.id).await.map_err(internal)? {
            return Err(AppError::not_found("user not found"));
        }
        info!(user_id = %user.id, "user removed");
        Ok(())
    }
}

pub(crate) fn internal(e: StoreError) -> AppError {
    AppError::Internal(anyhow::Error::new(e))
}
