use super::repository;
use crate::{modules::user, types::Context};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
    InvalidSession,
    ExpiredToken,
    UpstreamFailed,
}

type Result<T> = std::result::Result<T, Error>;

pub async fn create_session(ctx: Arc<Context>, user_id: String) -> Result<repository::Session> {
    repository::create(&ctx.db_conn.pool, user_id)
        .await
        .map_err(|_| Error::UnexpectedError)
}

pub async fn verify_access_token(
    ctx: Arc<Context>,
    access_token: String,
) -> Result<repository::Session> {
    let session = repository::find_by_access_token(&ctx.db_conn.pool, access_token)
        .await
        .map_err(|_| Error::UnexpectedError)?
        .ok_or(Error::InvalidSession)?;

    if session.expires_at < Utc::now().naive_utc() {
        return Err(Error::ExpiredToken);
    };

    Ok(session)
}

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
}

/// Exchanges an OAuth authorization code for the Google profile behind it.
/// Provider failures are logged here and surfaced as UpstreamFailed; callers
/// never see provider error bodies.
pub async fn exchange_code_for_profile(ctx: Arc<Context>, code: String) -> Result<GoogleProfile> {
    let client = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .map_err(|err| {
            tracing::error!("Failed to build http client: {}", err);
            Error::UnexpectedError
        })?;

    let token_response = client
        .post(GOOGLE_TOKEN_ENDPOINT)
        .form(&[
            ("code", code.as_str()),
            ("client_id", ctx.google.oauth_client_id.as_str()),
            ("client_secret", ctx.google.oauth_client_secret.as_str()),
            ("redirect_uri", ctx.google.oauth_redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to send token request to Google: {}", err);
            Error::UpstreamFailed
        })?;

    if !token_response.status().is_success() {
        tracing::error!(
            "Google token endpoint returned status {}",
            token_response.status()
        );
        return Err(Error::UpstreamFailed);
    }

    let token = token_response
        .json::<GoogleTokenResponse>()
        .await
        .map_err(|err| {
            tracing::error!("Failed to decode Google token response: {}", err);
            Error::UpstreamFailed
        })?;

    let profile_response = client
        .get(GOOGLE_USERINFO_ENDPOINT)
        .bearer_auth(token.access_token)
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to send userinfo request to Google: {}", err);
            Error::UpstreamFailed
        })?;

    if !profile_response.status().is_success() {
        tracing::error!(
            "Google userinfo endpoint returned status {}",
            profile_response.status()
        );
        return Err(Error::UpstreamFailed);
    }

    profile_response
        .json::<GoogleProfile>()
        .await
        .map_err(|err| {
            tracing::error!("Failed to decode Google userinfo response: {}", err);
            Error::UpstreamFailed
        })
}

/// First sign-in creates the user row with a NULL nickname; picking one is
/// the onboarding page's job.
pub async fn find_or_create_user(
    ctx: Arc<Context>,
    profile: GoogleProfile,
) -> Result<user::repository::User> {
    match user::repository::find_by_id(&ctx.db_conn.pool, profile.sub.clone()).await {
        Ok(Some(existing)) => Ok(existing),
        Ok(None) => user::repository::create(
            &ctx.db_conn.pool,
            user::repository::CreateUserPayload {
                id: profile.sub,
                email: profile.email,
                auth_provider: "google".to_string(),
            },
        )
        .await
        .map_err(|_| Error::UnexpectedError),
        Err(_) => Err(Error::UnexpectedError),
    }
}
