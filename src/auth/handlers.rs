use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        extractors::AuthUser,
    },
    envelope::{Created, Envelope},
    error::AppResult,
    state::AppState,
    users::dto::PublicUser,
    validation::ValidJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Envelope<AuthResponse>> {
    let (user, token) = state
        .auth
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(Envelope::ok(
        "login successful",
        AuthResponse {
            user: user.into(),
            token,
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<Created<PublicUser>> {
    let user = state
        .auth
        .register(payload.name, payload.email, &payload.password)
        .await?;
    Ok(Created(Envelope::ok("user created", user.into())))
}

/// The caller's record as resolved from the token on this request.
#[instrument(skip(caller), fields(user_id = %caller.0.id))]
pub async fn get_me(caller: AuthUser) -> AppResult<Envelope<PublicUser>> {
    let AuthUser(user) = caller;
    Ok(Envelope::ok("current user", user.into()))
}
