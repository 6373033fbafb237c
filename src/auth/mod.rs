use crate::state::AppState;
use axum::Router;

mod claims;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod oauth;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
