use crate::types::Context;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const PLACES_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

const FOOD_TERMS: [&str; 3] = ["restaurant", "food", "cafe"];

pub enum Error {
    RequestNotSent,
    InvalidProviderStatus,
    FailedToDecodeResponse,
}

#[derive(Deserialize)]
struct ProviderResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// Keeps text searches inside the food domain: append "restaurant" unless
/// the query already names a food term.
pub fn scope_query_to_food(query: &str) -> String {
    let lowered = query.to_lowercase();
    match FOOD_TERMS.iter().any(|term| lowered.contains(term)) {
        true => query.to_string(),
        false => format!("{} restaurant", query),
    }
}

async fn send_maps_request(
    url: &str,
    query: &[(&str, &str)],
    accepted_statuses: &[&str],
) -> Result<Vec<serde_json::Value>, Error> {
    let client = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .map_err(|err| {
            tracing::error!("Failed to build http client: {}", err);
            Error::RequestNotSent
        })?;

    let res = client.get(url).query(query).send().await.map_err(|err| {
        tracing::error!("Failed to send Google Maps request: {}", err);
        Error::RequestNotSent
    })?;

    let data = res.text().await.map_err(|err| {
        tracing::error!("Failed to get text of Google Maps response: {}", err);
        Error::FailedToDecodeResponse
    })?;

    let response = serde_json::de::from_str::<ProviderResponse>(&data).map_err(|err| {
        tracing::error!("Failed to decode Google Maps response: {}", err);
        Error::FailedToDecodeResponse
    })?;

    if !accepted_statuses.contains(&response.status.as_str()) {
        tracing::error!(
            "Google Maps returned status {}: {}",
            response.status,
            response.error_message.unwrap_or_default()
        );
        return Err(Error::InvalidProviderStatus);
    }

    Ok(response.results)
}

pub async fn geocode(ctx: Arc<Context>, address: String) -> Result<Vec<serde_json::Value>, Error> {
    send_maps_request(
        GEOCODE_ENDPOINT,
        &[
            ("address", address.as_str()),
            ("key", ctx.google.maps_api_key.as_str()),
        ],
        &["OK"],
    )
    .await
}

pub async fn search_places(
    ctx: Arc<Context>,
    query: String,
    location: Option<(String, String)>,
) -> Result<Vec<serde_json::Value>, Error> {
    let scoped = scope_query_to_food(query.as_str());

    match location {
        Some((lat, lng)) => {
            let location = format!("{},{}", lat, lng);
            send_maps_request(
                PLACES_ENDPOINT,
                &[
                    ("query", scoped.as_str()),
                    ("key", ctx.google.maps_api_key.as_str()),
                    ("location", location.as_str()),
                    ("radius", "5000"),
                ],
                &["OK", "ZERO_RESULTS"],
            )
            .await
        }
        None => {
            send_maps_request(
                PLACES_ENDPOINT,
                &[
                    ("query", scoped.as_str()),
                    ("key", ctx.google.maps_api_key.as_str()),
                ],
                &["OK", "ZERO_RESULTS"],
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_queries_are_scoped_to_restaurants() {
        assert_eq!(scope_query_to_food("kimchi"), "kimchi restaurant");
        assert_eq!(scope_query_to_food("성수동"), "성수동 restaurant");
    }

    #[test]
    fn food_queries_are_left_alone() {
        assert_eq!(scope_query_to_food("sushi restaurant"), "sushi restaurant");
        assert_eq!(scope_query_to_food("Best Food market"), "Best Food market");
        assert_eq!(scope_query_to_food("brunch CAFE"), "brunch CAFE");
    }
}
