use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::utils::database;

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub nickname: Option<String>,
    pub auth_provider: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreateUserPayload {
    pub id: String,
    pub email: String,
    pub auth_provider: String,
}

pub enum Error {
    UnexpectedError,
    DuplicateNickname,
}

pub async fn create(db: &PgPool, payload: CreateUserPayload) -> Result<User, Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, nickname, auth_provider) VALUES ($1, $2, NULL, $3) RETURNING *",
    )
    .bind(payload.id)
    .bind(payload.email)
    .bind(payload.auth_provider)
    .fetch_one(db)
    .await
    .map_err(|err| {
        log::error!("Error occurred while creating user: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id(db: &PgPool, id: String) -> Result<Option<User>, Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id.clone())
        .fetch_optional(db)
        .await
        .map_err(|err| {
            log::error!("Error occurred while fetching user with id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn is_nickname_taken(db: &PgPool, nickname: String) -> Result<bool, Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(id) FROM users WHERE nickname = $1")
        .bind(nickname)
        .fetch_one(db)
        .await
        .map(|count| count > 0)
        .map_err(|err| {
            log::error!("Error occurred in is_nickname_taken: {}", err);
            Error::UnexpectedError
        })
}

pub async fn find_holder_by_nickname(
    db: &PgPool,
    nickname: String,
) -> Result<Option<String>, Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE nickname = $1")
        .bind(nickname)
        .fetch_optional(db)
        .await
        .map_err(|err| {
            log::error!("Error occurred in find_holder_by_nickname: {}", err);
            Error::UnexpectedError
        })
}

// The partial unique index on users.nickname is the final arbiter here;
// a racing write loses with a 23505 which becomes DuplicateNickname.
pub async fn set_nickname_by_id(
    db: &PgPool,
    id: String,
    nickname: String,
) -> Result<User, Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET nickname = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(nickname)
    .bind(id)
    .fetch_one(db)
    .await
    .map_err(|err| {
        if database::is_unique_violation(&err) {
            return Error::DuplicateNickname;
        }
        log::error!("Error occurred while updating nickname: {}", err);
        Error::UnexpectedError
    })
}
