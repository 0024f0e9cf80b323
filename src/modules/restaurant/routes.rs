use super::repository;
use crate::{
    modules::auth::middleware::Auth,
    types::Context,
    utils,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

#[derive(Deserialize, Validate)]
struct RestaurantPayload {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    name: String,
    #[validate(length(min = 1, message = "Address must not be empty"))]
    address: String,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    longitude: f64,
    description: Option<String>,
}

fn create_failure_response(err: repository::Error) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        repository::Error::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "You already have a restaurant; update it instead" })),
        ),
        repository::Error::UnexpectedError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Restaurant creation failed" })),
        ),
    }
}

async fn create_restaurant(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<RestaurantPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match repository::find_by_owner_id(&ctx.db_conn.pool, auth.user.id.clone()).await {
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to find restaurant" })),
            )
        }
        Ok(Some(_)) => return create_failure_response(repository::Error::AlreadyExists),
        Ok(None) => (),
    };

    match repository::create(
        &ctx.db_conn.pool,
        repository::CreateRestaurantPayload {
            owner_id: auth.user.id,
            name: payload.name,
            address: payload.address,
            latitude: payload.latitude,
            longitude: payload.longitude,
            description: payload.description,
        },
    )
    .await
    {
        Ok(restaurant) => (StatusCode::CREATED, Json(json!({ "restaurant": restaurant }))),
        // A concurrent create slipping in between the check and the insert
        // loses at the unique index and gets the same conflict.
        Err(err) => create_failure_response(err),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    bounds: Option<String>,
}

fn parse_bounds(raw: &str) -> Option<repository::Bounds> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [lat1, lng1, lat2, lng2] if parts.iter().all(|n| n.is_finite()) => Some(
            repository::Bounds::from_corners(*lat1, *lng1, *lat2, *lng2),
        ),
        _ => None,
    }
}

async fn get_restaurants(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let bounds = match query.bounds.as_deref() {
        None => None,
        Some(raw) => match parse_bounds(raw) {
            Some(bounds) => Some(bounds),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Bounds must be lat1,lng1,lat2,lng2" })),
                )
            }
        },
    };

    let filters = repository::FindManyFilters {
        owner_id: query.user_id,
        bounds,
    };

    match repository::find_many(&ctx.db_conn.pool, filters).await {
        Ok(restaurants) => (StatusCode::OK, Json(json!({ "restaurants": restaurants }))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch restaurants" })),
        ),
    }
}

async fn get_my_restaurant(State(ctx): State<Arc<Context>>, auth: Auth) -> impl IntoResponse {
    match repository::find_by_owner_id(&ctx.db_conn.pool, auth.user.id).await {
        Ok(restaurant) => (
            StatusCode::OK,
            Json(json!({
                "restaurant": restaurant,
                "hasRestaurant": restaurant.is_some(),
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch restaurant" })),
        ),
    }
}

async fn update_restaurant(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Path(id): Path<String>,
    Json(payload): Json<RestaurantPayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors).into_response();
    }

    let restaurant = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to find restaurant" })),
            )
                .into_response()
        }
    };

    if !repository::is_owner(auth.user.id.as_str(), &restaurant) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can only update your own restaurant" })),
        )
            .into_response();
    }

    match repository::update_by_id(
        &ctx.db_conn.pool,
        restaurant.id,
        repository::UpdateRestaurantPayload {
            name: payload.name,
            address: payload.address,
            latitude: payload.latitude,
            longitude: payload.longitude,
            description: payload.description,
        },
    )
    .await
    {
        Ok(updated) => (StatusCode::OK, Json(json!({ "restaurant": updated }))).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update restaurant" })),
        )
            .into_response(),
    }
}

async fn delete_restaurant(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Path(id): Path<String>,
) -> Response {
    let restaurant = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to find restaurant" })),
            )
                .into_response()
        }
    };

    if !repository::is_owner(auth.user.id.as_str(), &restaurant) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can only delete your own restaurant" })),
        )
            .into_response();
    }

    match repository::delete_by_id(&ctx.db_conn.pool, restaurant.id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to delete restaurant" })),
        )
            .into_response(),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", post(create_restaurant).get(get_restaurants))
        .route("/my", get(get_my_restaurant))
        .route(
            "/:id",
            axum::routing::put(update_restaurant).delete(delete_restaurant),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_parse_accepts_any_corner_order() {
        let a = parse_bounds("37.5,127.0,37.6,127.1").unwrap();
        let b = parse_bounds("37.6,127.1,37.5,127.0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bounds_parse_rejects_malformed_input() {
        assert!(parse_bounds("").is_none());
        assert!(parse_bounds("37.5,127.0,37.6").is_none());
        assert!(parse_bounds("37.5,127.0,37.6,127.1,0.0").is_none());
        assert!(parse_bounds("37.5,127.0,abc,127.1").is_none());
        assert!(parse_bounds("NaN,127.0,37.6,127.1").is_none());
    }

    #[test]
    fn second_create_for_same_owner_is_a_conflict() {
        // Both the pre-check and a racing insert's unique violation land here.
        let (status, _) = create_failure_response(repository::Error::AlreadyExists);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn store_failure_on_create_is_not_reported_as_conflict() {
        let (status, _) = create_failure_response(repository::Error::UnexpectedError);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn payload_requires_name_and_address() {
        let payload = RestaurantPayload {
            name: "".to_string(),
            address: "Seoul".to_string(),
            latitude: 37.5,
            longitude: 127.0,
            description: None,
        };
        assert!(payload.validate().is_err());

        let payload = RestaurantPayload {
            name: "Kimchi House".to_string(),
            address: "".to_string(),
            latitude: 37.5,
            longitude: 127.0,
            description: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payload_rejects_out_of_range_coordinates() {
        let payload = RestaurantPayload {
            name: "Kimchi House".to_string(),
            address: "Seoul".to_string(),
            latitude: 91.0,
            longitude: 127.0,
            description: None,
        };
        assert!(payload.validate().is_err());

        let payload = RestaurantPayload {
            name: "Kimchi House".to_string(),
            address: "Seoul".to_string(),
            latitude: 37.5,
            longitude: f64::NAN,
            description: None,
        };
        assert!(payload.validate().is_err());
    }
}
