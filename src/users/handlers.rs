use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    envelope::{Created, Envelope},
    error::AppResult,
    state::AppState,
    users::{
        dto::{
            AdminEditRequest, AdminEditResponse, CreateUserRequest, EditedBy, PublicUser,
            UpdateUserRequest, UserQuery,
        },
        policy::Requester,
        repo_types::User,
    },
    validation::{ValidJson, ValidPath, ValidQuery},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/inactive", get(list_inactive))
        .route("/users/admin/edit/:id", put(admin_edit_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(remove_user),
        )
}

fn public(users: Vec<User>) -> Vec<PublicUser> {
    users.into_iter().map(PublicUser::from).collect()
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidJson(payload): ValidJson<CreateUserRequest>,
) -> AppResult<Created<PublicUser>> {
    let user = state.users.create_user(payload).await?;
    Ok(Created(Envelope::ok("user created", user.into())))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidQuery(query): ValidQuery<UserQuery>,
) -> AppResult<Envelope<Vec<PublicUser>>> {
    let filter = query.into_filter()?;
    let users = state.users.list_users(filter).await?;
    Ok(Envelope::ok("users listed", public(users)))
}

#[instrument(skip(state, _admin))]
pub async fn list_inactive(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Envelope<Vec<PublicUser>>> {
    let users = state.users.list_inactive().await?;
    Ok(Envelope::ok("inactive users listed", public(users)))
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Envelope<PublicUser>> {
    let user = state.users.find_by_id(id, &caller.requester()).await?;
    Ok(Envelope::ok("user found", user.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> AppResult<Envelope<PublicUser>> {
    let user = state
        .users
        .self_or_admin_update(id, &caller.requester(), payload)
        .await?;
    Ok(Envelope::ok("user updated", user.into()))
}

#[instrument(skip(state, admin, payload))]
pub async fn admin_edit_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<AdminEditRequest>,
) -> AppResult<Envelope<AdminEditResponse>> {
    let user = state
        .users
        .admin_elevated_edit(id, &Requester::from(&admin), payload)
        .await?;
    Ok(Envelope::ok(
        "user edited by administrator",
        AdminEditResponse {
            user: user.into(),
            edited_by: EditedBy {
                id: admin.id,
                name: admin.name,
                email: admin.email,
            },
            edited_at: OffsetDateTime::now_utc(),
        },
    ))
}

#[instrument(skip(state, caller))]
pub async fn remove_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Envelope<()>> {
    state.users.remove(id, &caller.requester()).await?;
    Ok(Envelope::done("user removed"))
}
