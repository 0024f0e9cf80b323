use super::middleware::get_session_user;
use crate::types::Context;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PathClass {
    Public,
    Onboarding,
    Protected,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SessionState {
    Anonymous,
    NeedsNickname,
    Onboarded,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Decision {
    Allow,
    ToLogin { return_url: Option<String> },
    ToOnboarding,
    ToMap,
}

pub fn classify(path: &str) -> Option<PathClass> {
    match path {
        "/" | "/login" => Some(PathClass::Public),
        "/onboarding" => Some(PathClass::Onboarding),
        "/map" | "/add-restaurant" => Some(PathClass::Protected),
        _ if path.starts_with("/edit-restaurant/") => Some(PathClass::Protected),
        _ => None,
    }
}

/// The whole guard is this table. Signed-in users without a nickname are
/// steered to onboarding from every path class, matching where the OAuth
/// callback already sends them.
pub fn decide(class: PathClass, state: SessionState, path: &str) -> Decision {
    match (class, state) {
        (PathClass::Public, SessionState::Anonymous) => Decision::Allow,
        (PathClass::Public, SessionState::NeedsNickname) => Decision::ToOnboarding,
        (PathClass::Public, SessionState::Onboarded) => Decision::ToMap,

        (PathClass::Onboarding, SessionState::Anonymous) => {
            Decision::ToLogin { return_url: None }
        }
        (PathClass::Onboarding, SessionState::NeedsNickname) => Decision::Allow,
        (PathClass::Onboarding, SessionState::Onboarded) => Decision::ToMap,

        (PathClass::Protected, SessionState::Anonymous) => Decision::ToLogin {
            return_url: Some(path.to_string()),
        },
        (PathClass::Protected, SessionState::NeedsNickname) => Decision::ToOnboarding,
        (PathClass::Protected, SessionState::Onboarded) => Decision::Allow,
    }
}

fn redirect_target(decision: &Decision) -> Option<String> {
    match decision {
        Decision::Allow => None,
        Decision::ToLogin { return_url: None } => Some("/login".to_string()),
        Decision::ToLogin {
            return_url: Some(path),
        } => Some(format!("/login?returnUrl={}", urlencoding::encode(path))),
        Decision::ToOnboarding => Some("/onboarding".to_string()),
        Decision::ToMap => Some("/map".to_string()),
    }
}

async fn guard(State(ctx): State<Arc<Context>>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    let Some(class) = classify(path.as_str()) else {
        return next.run(request).await;
    };

    let state = match get_session_user(ctx, request.headers()).await {
        None => SessionState::Anonymous,
        Some(user) => match user.nickname {
            None => SessionState::NeedsNickname,
            Some(_) => SessionState::Onboarded,
        },
    };

    let decision = decide(class, state, path.as_str());
    match redirect_target(&decision) {
        Some(target) => Redirect::to(target.as_str()).into_response(),
        None => next.run(request).await,
    }
}

// The pages themselves are rendered by the frontend; the server only owns
// the redirect decisions, so each page route is a bare 200.
async fn page() -> StatusCode {
    StatusCode::OK
}

pub fn get_router(ctx: Arc<Context>) -> Router<Arc<Context>> {
    Router::new()
        .route("/", get(page))
        .route("/login", get(page))
        .route("/onboarding", get(page))
        .route("/map", get(page))
        .route("/add-restaurant", get(page))
        .route("/edit-restaurant/:id", get(page))
        .layer(from_fn_with_state(ctx, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_page_paths() {
        assert_eq!(classify("/"), Some(PathClass::Public));
        assert_eq!(classify("/login"), Some(PathClass::Public));
        assert_eq!(classify("/onboarding"), Some(PathClass::Onboarding));
        assert_eq!(classify("/map"), Some(PathClass::Protected));
        assert_eq!(classify("/add-restaurant"), Some(PathClass::Protected));
        assert_eq!(
            classify("/edit-restaurant/01J0000000"),
            Some(PathClass::Protected)
        );
        assert_eq!(classify("/api/restaurants"), None);
    }

    #[test]
    fn anonymous_user_is_sent_to_login_with_return_url() {
        let decision = decide(
            PathClass::Protected,
            SessionState::Anonymous,
            "/add-restaurant",
        );
        assert_eq!(
            redirect_target(&decision),
            Some("/login?returnUrl=%2Fadd-restaurant".to_string())
        );
    }

    #[test]
    fn anonymous_user_may_view_public_pages() {
        assert_eq!(
            decide(PathClass::Public, SessionState::Anonymous, "/"),
            Decision::Allow
        );
        assert_eq!(
            decide(PathClass::Onboarding, SessionState::Anonymous, "/onboarding"),
            Decision::ToLogin { return_url: None }
        );
    }

    #[test]
    fn user_without_nickname_always_lands_on_onboarding() {
        for (class, path) in [
            (PathClass::Public, "/"),
            (PathClass::Protected, "/map"),
        ] {
            assert_eq!(
                decide(class, SessionState::NeedsNickname, path),
                Decision::ToOnboarding
            );
        }
        assert_eq!(
            decide(PathClass::Onboarding, SessionState::NeedsNickname, "/onboarding"),
            Decision::Allow
        );
    }

    #[test]
    fn onboarded_user_is_kept_on_the_map() {
        assert_eq!(
            decide(PathClass::Public, SessionState::Onboarded, "/login"),
            Decision::ToMap
        );
        assert_eq!(
            decide(PathClass::Onboarding, SessionState::Onboarded, "/onboarding"),
            Decision::ToMap
        );
        assert_eq!(
            decide(PathClass::Protected, SessionState::Onboarded, "/map"),
            Decision::Allow
        );
    }
}
