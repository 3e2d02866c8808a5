//! Network-address geolocation client
//!
//! Queries an ip-api.com compatible endpoint for the place, ISP, and
//! proxy/hosting indicators behind a network address. The public entry
//! point fails soft: any transport failure, non-success status, or an
//! explicit "fail" response from the provider yields an all-null result
//! with both indicator booleans false. Single attempt, no retries.

use crate::models::LocationDescriptor;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://ip-api.com/json";
const USER_AGENT: &str = concat!("txp-ig/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fields requested from the provider
const FIELDS: &str = "status,message,country,countryCode,region,regionName,city,isp,mobile,proxy,hosting";

/// Network lookup errors (internal; absorbed by [`IpLookupClient::lookup`])
#[derive(Debug, Error)]
pub enum IpLookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}")]
    Api(u16),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// ip-api.com response shape
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    #[serde(default)]
    proxy: bool,
    #[serde(default)]
    hosting: bool,
}

/// Result of a network-address lookup: normalized place descriptor plus
/// provider-reported anomaly indicators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkGeo {
    pub location: LocationDescriptor,
    pub is_vpn: bool,
    pub is_datacenter: bool,
    pub isp: Option<String>,
}

/// ip-api.com compatible lookup client
pub struct IpLookupClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl IpLookupClient {
    pub fn new(base_url: Option<String>) -> Result<Self, IpLookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IpLookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Look up a network address, failing soft to the all-null result.
    pub async fn lookup(&self, address: &str) -> NetworkGeo {
        match self.query(address).await {
            Ok(geo) => geo,
            Err(e) => {
                warn!(address = %address, error = %e, "Network geolocation degraded to null");
                NetworkGeo::default()
            }
        }
    }

    async fn query(&self, address: &str) -> Result<NetworkGeo, IpLookupError> {
        let url = format!("{}/{}?fields={}", self.base_url, address, FIELDS);
        debug!(address = %address, "Querying network geolocation provider");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| IpLookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IpLookupError::Api(status.as_u16()));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| IpLookupError::Parse(e.to_string()))?;

        if body.status == "fail" {
            return Err(IpLookupError::LookupFailed(
                body.message.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        Ok(NetworkGeo {
            location: LocationDescriptor {
                city: body.city,
                region: body.region_name,
                country: body.country,
                country_code: body.country_code,
            },
            is_vpn: body.proxy,
            is_datacenter: body.hosting,
            isp: body.isp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        assert!(IpLookupClient::new(None).is_ok());
    }

    #[test]
    fn provider_fail_status_parses() {
        let body: IpApiResponse = serde_json::from_str(
            r#"{"status":"fail","message":"private range"}"#,
        )
        .unwrap();
        assert_eq!(body.status, "fail");
        assert!(!body.proxy);
    }

    #[test]
    fn success_response_maps_to_descriptor() {
        let body: IpApiResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "country": "Germany",
                "countryCode": "DE",
                "regionName": "Berlin",
                "city": "Berlin",
                "isp": "Example ISP",
                "proxy": false,
                "hosting": true
            }"#,
        )
        .unwrap();
        assert_eq!(body.country_code.as_deref(), Some("DE"));
        assert!(body.hosting);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_null() {
        // Nothing listens on this port; connection is refused immediately
        let client = IpLookupClient::new(Some("http://127.0.0.1:1".to_string())).unwrap();
        let geo = client.lookup("203.0.113.7").await;
        assert_eq!(geo, NetworkGeo::default());
    }
}
