use chrono::{NaiveDateTime, Utc};
use sqlx::PgPool;
use ulid::Ulid;

#[derive(Clone, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub access_token: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

pub enum Error {
    UnexpectedError,
}

pub async fn create(db: &PgPool, user_id: String) -> Result<Session, Error> {
    sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (id, user_id, access_token, expires_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Ulid::new().to_string())
    .bind(user_id.clone())
    .bind(Ulid::new().to_string())
    .bind(Utc::now().naive_utc() + chrono::Duration::days(7))
    .fetch_one(db)
    .await
    .map_err(|err| {
        log::error!(
            "Error occurred while creating a session for user with id {}: {}",
            user_id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn find_by_access_token(
    db: &PgPool,
    access_token: String,
) -> Result<Option<Session>, Error> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE access_token = $1")
        .bind(access_token)
        .fetch_optional(db)
        .await
        .map_err(|err| {
            log::error!("Error occurred in find_by_access_token: {}", err);
            Error::UnexpectedError
        })
}
