use crate::state::AppState;
use axum::Router;

pub mod dates;
mod dto;
pub mod export;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::analytics_routes()
}
