use super::{middleware::SESSION_COOKIE, service};
use crate::types::{AppEnvironment, Context};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

// Secure is only set in production so local http development keeps working.
fn session_cookie(access_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, access_token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

async fn oauth_callback(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> impl IntoResponse {
    let Some(code) = query.code else {
        return (jar, Redirect::to("/login")).into_response();
    };

    let profile = match service::exchange_code_for_profile(ctx.clone(), code).await {
        Ok(profile) => profile,
        Err(_) => return (jar, Redirect::to("/login")).into_response(),
    };

    let user = match service::find_or_create_user(ctx.clone(), profile).await {
        Ok(user) => user,
        Err(_) => return (jar, Redirect::to("/login")).into_response(),
    };

    let session = match service::create_session(ctx.clone(), user.id.clone()).await {
        Ok(session) => session,
        Err(_) => return (jar, Redirect::to("/login")).into_response(),
    };

    let cookie = session_cookie(
        session.access_token,
        matches!(ctx.app.environment, AppEnvironment::Production),
    );

    let destination = match user.nickname {
        Some(_) => "/map",
        None => "/onboarding",
    };

    (jar.add(cookie), Redirect::to(destination)).into_response()
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().route("/callback", get(oauth_callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        let cookie = session_cookie("token".to_string(), false);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn session_cookie_is_secure_in_production() {
        let cookie = session_cookie("token".to_string(), true);
        assert_eq!(cookie.secure(), Some(true));
    }
}
