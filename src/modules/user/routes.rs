use super::{onboarding, repository};
use crate::{
    modules::auth::middleware::Auth,
    types::Context,
    utils,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

#[derive(Deserialize, Validate)]
struct NicknamePayload {
    #[validate(custom(function = "onboarding::validate_nickname"))]
    nickname: String,
}

async fn check_nickname(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<NicknamePayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match repository::is_nickname_taken(&ctx.db_conn.pool, payload.nickname).await {
        Ok(taken) => (StatusCode::OK, Json(json!({ "available": !taken }))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to check nickname" })),
        ),
    }
}

// Re-submitting your own current nickname is not a conflict; only another
// user holding it is.
fn is_held_by_other(holder: Option<&str>, requester_id: &str) -> bool {
    holder.is_some_and(|id| id != requester_id)
}

async fn update_nickname(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<NicknamePayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    // A racing claim of the same nickname between this check and the write
    // still loses at the unique index and comes back as DuplicateNickname.
    match repository::find_holder_by_nickname(&ctx.db_conn.pool, payload.nickname.clone()).await {
        Ok(holder) if is_held_by_other(holder.as_deref(), auth.user.id.as_str()) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Nickname is already in use" })),
            )
        }
        Ok(_) => (),
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to check nickname" })),
            )
        }
    }

    match repository::set_nickname_by_id(&ctx.db_conn.pool, auth.user.id, payload.nickname).await
    {
        Ok(user) => (StatusCode::OK, Json(json!({ "user": user }))),
        Err(repository::Error::DuplicateNickname) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Nickname is already in use" })),
        ),
        Err(repository::Error::UnexpectedError) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update nickname" })),
        ),
    }
}

async fn suggest_nickname(State(ctx): State<Arc<Context>>, auth: Auth) -> impl IntoResponse {
    match onboarding::resolve_initial_nickname(&ctx.db_conn.pool, auth.user.email).await {
        Ok(suggestion) => (StatusCode::OK, Json(json!({ "suggestion": suggestion }))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to suggest nickname" })),
        ),
    }
}

async fn get_me(auth: Auth) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "user": auth.user })))
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/check-nickname", post(check_nickname))
        .route("/nickname", put(update_nickname))
        .route("/nickname-suggestion", get(suggest_nickname))
        .route("/me", get(get_me))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_nickname_does_not_conflict() {
        assert!(!is_held_by_other(None, "u1"));
    }

    #[test]
    fn resubmitting_own_nickname_does_not_conflict() {
        assert!(!is_held_by_other(Some("u1"), "u1"));
    }

    #[test]
    fn nickname_held_by_another_user_conflicts() {
        assert!(is_held_by_other(Some("u2"), "u1"));
    }
}
