mod app;
mod auth;
mod config;
mod db;
mod envelope;
mod error;
mod seed;
mod state;
mod users;
mod validation;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userdir=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let seed = config.seed_default_users;
    let state = AppState::init(config).await?;

    if seed {
        let created = seed::seed_default_users(&state.users).await?;
        tracing::info!(created, "default users seeded");
    }

    let app = app::build_app(state);
    app::serve(app).await
}
