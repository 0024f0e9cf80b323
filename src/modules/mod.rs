pub mod auth;
pub mod places;
pub mod restaurant;
pub mod user;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .nest(
            "/auth",
            auth::routes::get_router().merge(user::routes::get_router()),
        )
        .nest("/restaurants", restaurant::routes::get_router())
        .merge(places::routes::get_router())
}
