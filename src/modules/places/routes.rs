use super::service;
use crate::types::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
struct GeocodeQuery {
    address: Option<String>,
}

async fn geocode(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<GeocodeQuery>,
) -> impl IntoResponse {
    let Some(address) = query.address.filter(|address| !address.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Address is required" })),
        );
    };

    match service::geocode(ctx, address).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "Failed to look up location" })),
        ),
    }
}

#[derive(Deserialize)]
struct PlacesQuery {
    query: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
}

async fn search_places(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<PlacesQuery>,
) -> impl IntoResponse {
    let Some(text) = query.query.filter(|text| !text.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Search query is required" })),
        );
    };

    let location = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };

    match service::search_places(ctx, text, location).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "Failed to search restaurants" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/geocode", get(geocode))
        .route("/places", get(search_places))
}
