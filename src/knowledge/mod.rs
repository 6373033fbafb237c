use crate::state::AppState;
use axum::Router;

pub mod client;
mod dto;
pub mod files;
pub mod handlers;
pub mod prompt;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::knowledge_routes()
}
