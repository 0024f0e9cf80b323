use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use ulid::Ulid;

use crate::utils::database;

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Restaurant {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Serialize, Clone, Debug)]
pub struct RestaurantOwner {
    pub id: String,
    pub nickname: Option<String>,
}

/// A restaurant joined with the owner fields the map needs for pin labels.
#[derive(Serialize, Clone, Debug)]
pub struct RestaurantWithOwner {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub owner: RestaurantOwner,
}

/// Rectangular map region, normalized so corner order never matters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl Bounds {
    pub fn from_corners(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Self {
        Self {
            lat_min: lat1.min(lat2),
            lat_max: lat1.max(lat2),
            lng_min: lng1.min(lng2),
            lng_max: lng1.max(lng2),
        }
    }
}

#[derive(Default, Clone)]
pub struct FindManyFilters {
    pub owner_id: Option<String>,
    pub bounds: Option<Bounds>,
}

pub struct CreateRestaurantPayload {
    pub owner_id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

pub struct UpdateRestaurantPayload {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

pub enum Error {
    UnexpectedError,
    AlreadyExists,
}

pub fn is_owner(user_id: &str, restaurant: &Restaurant) -> bool {
    restaurant.owner_id == user_id
}

// UNIQUE(owner_id) is the final arbiter for one-restaurant-per-owner; a
// racing insert loses with 23505 which becomes AlreadyExists.
pub async fn create(db: &PgPool, payload: CreateRestaurantPayload) -> Result<Restaurant, Error> {
    sqlx::query_as::<_, Restaurant>(
        "
        INSERT INTO restaurants (id, owner_id, name, address, latitude, longitude, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.owner_id)
    .bind(payload.name)
    .bind(payload.address)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.description)
    .fetch_one(db)
    .await
    .map_err(|err| {
        if database::is_unique_violation(&err) {
            return Error::AlreadyExists;
        }
        log::error!("Error occurred while creating restaurant: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id(db: &PgPool, id: String) -> Result<Option<Restaurant>, Error> {
    sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
        .bind(id.clone())
        .fetch_optional(db)
        .await
        .map_err(|err| {
            log::error!(
                "Error occurred while fetching restaurant with id {}: {}",
                id,
                err
            );
            Error::UnexpectedError
        })
}

pub async fn find_by_owner_id(db: &PgPool, owner_id: String) -> Result<Option<Restaurant>, Error> {
    sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(db)
        .await
        .map_err(|err| {
            log::error!("Error occurred in find_by_owner_id: {}", err);
            Error::UnexpectedError
        })
}

pub async fn find_many(
    db: &PgPool,
    filters: FindManyFilters,
) -> Result<Vec<RestaurantWithOwner>, Error> {
    let mut query = QueryBuilder::<Postgres>::new(
        "
        SELECT r.*, u.nickname AS owner_nickname
        FROM restaurants r
        JOIN users u ON u.id = r.owner_id
        WHERE TRUE
        ",
    );

    if let Some(owner_id) = filters.owner_id {
        query.push(" AND r.owner_id = ").push_bind(owner_id);
    }

    if let Some(bounds) = filters.bounds {
        query
            .push(" AND r.latitude BETWEEN ")
            .push_bind(bounds.lat_min)
            .push(" AND ")
            .push_bind(bounds.lat_max)
            .push(" AND r.longitude BETWEEN ")
            .push_bind(bounds.lng_min)
            .push(" AND ")
            .push_bind(bounds.lng_max);
    }

    query.push(" ORDER BY r.created_at DESC");

    let rows = query.build().fetch_all(db).await.map_err(|err| {
        log::error!("Error occurred while fetching restaurants: {}", err);
        Error::UnexpectedError
    })?;

    rows.into_iter()
        .map(|row| {
            let restaurant = Restaurant::from_row(&row).map_err(|err| {
                log::error!("Error occurred while decoding restaurant row: {}", err);
                Error::UnexpectedError
            })?;
            let owner = RestaurantOwner {
                id: restaurant.owner_id.clone(),
                nickname: row.try_get("owner_nickname").map_err(|err| {
                    log::error!("Error occurred while decoding owner nickname: {}", err);
                    Error::UnexpectedError
                })?,
            };
            Ok(RestaurantWithOwner { restaurant, owner })
        })
        .collect()
}

pub async fn update_by_id(
    db: &PgPool,
    id: String,
    payload: UpdateRestaurantPayload,
) -> Result<Restaurant, Error> {
    sqlx::query_as::<_, Restaurant>(
        "
        UPDATE restaurants SET
            name = $1,
            address = $2,
            latitude = $3,
            longitude = $4,
            description = $5,
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        ",
    )
    .bind(payload.name)
    .bind(payload.address)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.description)
    .bind(id)
    .fetch_one(db)
    .await
    .map_err(|err| {
        log::error!("Error occurred while updating restaurant: {}", err);
        Error::UnexpectedError
    })
}

pub async fn delete_by_id(db: &PgPool, id: String) -> Result<(), Error> {
    sqlx::query("DELETE FROM restaurants WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map(|_| ())
        .map_err(|err| {
            log::error!("Error occurred while deleting restaurant: {}", err);
            Error::UnexpectedError
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_corner_order_independent() {
        let a = Bounds::from_corners(37.5, 127.0, 37.6, 127.1);
        let b = Bounds::from_corners(37.6, 127.1, 37.5, 127.0);
        let c = Bounds::from_corners(37.6, 127.0, 37.5, 127.1);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.lat_min, 37.5);
        assert_eq!(a.lat_max, 37.6);
        assert_eq!(a.lng_min, 127.0);
        assert_eq!(a.lng_max, 127.1);
    }

    #[test]
    fn owner_check_matches_owner_id() {
        let restaurant = Restaurant {
            id: "r1".to_string(),
            owner_id: "u1".to_string(),
            name: "Kimchi House".to_string(),
            address: "Seoul".to_string(),
            latitude: 37.5,
            longitude: 127.0,
            description: None,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        };
        assert!(is_owner("u1", &restaurant));
        assert!(!is_owner("u2", &restaurant));
    }
}
