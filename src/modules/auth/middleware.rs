use super::service;
use crate::modules::user;
use crate::modules::user::repository::User;
use crate::types::Context;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::RequestPartsExt;
use axum::{async_trait, Json};
use axum::{extract::Extension, http, http::request::Parts, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "session";

enum Error {
    InvalidSession,
}

fn get_access_token_from_header(header: String) -> Result<String, Error> {
    header
        .split(' ')
        .nth(1)
        .map(|h| h.to_string())
        .ok_or(Error::InvalidSession)
}

/// Pulls the session token out of either the Authorization header (API
/// clients) or the session cookie (browser navigation).
fn get_access_token(headers: &HeaderMap) -> Result<String, Error> {
    if let Some(header) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        return get_access_token_from_header(header.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(Error::InvalidSession)
}

async fn get_user_from_token(ctx: Arc<Context>, access_token: String) -> Result<User, Error> {
    let session = service::verify_access_token(ctx.clone(), access_token)
        .await
        .map_err(|_| Error::InvalidSession)?;

    user::repository::find_by_id(&ctx.db_conn.pool, session.user_id)
        .await
        .map_err(|_| Error::InvalidSession)?
        .ok_or(Error::InvalidSession)
}

/// Resolves the user behind the request's session, if any. The route guard
/// uses this directly; handlers use the Auth extractor below.
pub async fn get_session_user(ctx: Arc<Context>, headers: &HeaderMap) -> Option<User> {
    let access_token = get_access_token(headers).ok()?;
    get_user_from_token(ctx, access_token).await.ok()
}

#[derive(Serialize, Clone)]
pub struct Auth {
    pub user: User,
}

async fn get_user_from_request(ctx: Arc<Context>, parts: &mut Parts) -> Result<User, Response> {
    let headers = parts.extract::<HeaderMap>().await.unwrap();

    let err = (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid session token"})),
    );

    let access_token =
        get_access_token(&headers).map_err(|_| err.clone().into_response())?;

    get_user_from_token(ctx, access_token)
        .await
        .map_err(|_| err.clone().into_response())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = parts.extract::<Extension<Arc<Context>>>().await.unwrap();
        get_user_from_request(ctx, parts)
            .await
            .map(|user| Self { user })
    }
}
