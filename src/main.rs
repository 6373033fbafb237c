use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

mod analytics;
mod app;
mod auth;
mod chat_users;
mod config;
mod error;
mod interactions;
mod knowledge;
mod pagination;
mod state;
mod storage;
#[cfg(test)]
mod testing;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "docqa=debug,axum=info,tower_http=info".to_string());
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
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let (host, port) = (config.host.clone(), config.port);
    let state = AppState::init(config, db).await?;
    app::serve(app::build_app(state), &host, port).await
}
