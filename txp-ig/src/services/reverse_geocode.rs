//! Reverse geocoding client
//!
//! Resolves device-sensor coordinates to a normalized place descriptor via
//! a BigDataCloud-compatible endpoint. Same fail-soft contract as the
//! network lookup: any failure yields the all-null descriptor. Single
//! attempt, no retries.

use crate::models::LocationDescriptor;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.bigdatacloud.net/data/reverse-geocode-client";
const USER_AGENT: &str = concat!("txp-ig/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse geocode errors (internal; absorbed by [`ReverseGeocodeClient::lookup`])
#[derive(Debug, Error)]
pub enum ReverseGeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}")]
    Api(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// BigDataCloud response shape (the fields we consume)
#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    city: Option<String>,
    locality: Option<String>,
    #[serde(rename = "principalSubdivision")]
    principal_subdivision: Option<String>,
    #[serde(rename = "countryName")]
    country_name: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

/// Reverse geocoding client
pub struct ReverseGeocodeClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ReverseGeocodeClient {
    pub fn new(base_url: Option<String>) -> Result<Self, ReverseGeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReverseGeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Reverse-geocode coordinates, failing soft to the all-null descriptor.
    pub async fn lookup(&self, lat: f64, lng: f64) -> LocationDescriptor {
        match self.query(lat, lng).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(lat, lng, error = %e, "Reverse geocoding degraded to null");
                LocationDescriptor::empty()
            }
        }
    }

    async fn query(&self, lat: f64, lng: f64) -> Result<LocationDescriptor, ReverseGeocodeError> {
        let url = format!(
            "{}?latitude={}&longitude={}&localityLanguage=en",
            self.base_url, lat, lng
        );
        debug!(lat, lng, "Querying reverse geocoding provider");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReverseGeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReverseGeocodeError::Api(status.as_u16()));
        }

        let body: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|e| ReverseGeocodeError::Parse(e.to_string()))?;

        // Some responses carry the place name only in `locality`
        let city = body.city.filter(|c| !c.is_empty()).or(body.locality);

        Ok(LocationDescriptor {
            city,
            region: body.principal_subdivision,
            country: body.country_name,
            country_code: body.country_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locality_backfills_missing_city() {
        let body: ReverseGeocodeResponse = serde_json::from_str(
            r#"{
                "city": "",
                "locality": "Mitte",
                "principalSubdivision": "Berlin",
                "countryName": "Germany",
                "countryCode": "DE"
            }"#,
        )
        .unwrap();
        let city = body.city.filter(|c| !c.is_empty()).or(body.locality);
        assert_eq!(city.as_deref(), Some("Mitte"));
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_null() {
        let client = ReverseGeocodeClient::new(Some("http://127.0.0.1:1".to_string())).unwrap();
        let descriptor = client.lookup(52.52, 13.405).await;
        assert_eq!(descriptor, LocationDescriptor::empty());
    }
}
