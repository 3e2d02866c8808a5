//! Submission wire contract
//!
//! Request and response types exchanged between the capture client (txp-cc)
//! and the ingest gateway (txp-ig). Field names are part of the public wire
//! contract and serialize in camelCase.

use serde::{Deserialize, Serialize};

/// Device-sensor coordinates supplied with a precise-location submission
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoCoords {
    pub lat: f64,
    pub lng: f64,
    /// Reported accuracy radius in meters
    pub accuracy: f64,
}

/// Client device and browser-equivalent signals, snapshotted at submit time
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
    pub screen_resolution: String,
    /// Primary language tag (first entry of the preference list)
    pub language: String,
}

/// One contact submission, as transmitted to the gateway
///
/// `message` is the only required field. Media travels base64-encoded
/// (optionally with a data-URL prefix, which the gateway strips).
/// `timezone_offset` is local-minus-UTC in minutes, east positive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub message: String,

    #[serde(default)]
    pub audio_data: Option<String>,
    /// Recorded duration in whole seconds, at most 60
    #[serde(default)]
    pub audio_duration: Option<i64>,
    #[serde(default)]
    pub image_data: Option<String>,

    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_social: Option<String>,

    #[serde(default)]
    pub location_precise: bool,
    #[serde(default)]
    pub location_coords: Option<GeoCoords>,

    pub device_info: DeviceInfo,
    /// IANA timezone name (e.g. "Europe/Berlin")
    pub timezone: String,
    pub timezone_offset: i64,
    /// Ordered language preference list, most preferred first
    pub languages: Vec<String>,
}

/// Resolved location summary echoed back on success
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationSummary {
    pub city: Option<String>,
    pub country: Option<String>,
    /// Provenance of the resolved location: "gps" or "ip"
    pub source: String,
}

/// Successful submission acknowledgement
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionAck {
    pub success: bool,
    pub id: String,
    pub location: LocationSummary,
}

/// Failure response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_wire_names() {
        let request = SubmissionRequest {
            message: "hello".to_string(),
            audio_data: None,
            audio_duration: Some(12),
            image_data: None,
            contact_email: Some("a@b.c".to_string()),
            contact_social: None,
            location_precise: true,
            location_coords: Some(GeoCoords {
                lat: 52.52,
                lng: 13.405,
                accuracy: 25.0,
            }),
            device_info: DeviceInfo {
                user_agent: "txp-cc/0.1.0".to_string(),
                platform: "linux".to_string(),
                screen_resolution: "80x24".to_string(),
                language: "en-US".to_string(),
            },
            timezone: "Europe/Berlin".to_string(),
            timezone_offset: 120,
            languages: vec!["en-US".to_string(), "de".to_string()],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["audioDuration"], json!(12));
        assert_eq!(value["contactEmail"], json!("a@b.c"));
        assert_eq!(value["locationPrecise"], json!(true));
        assert_eq!(value["locationCoords"]["lat"], json!(52.52));
        assert_eq!(value["deviceInfo"]["userAgent"], json!("txp-cc/0.1.0"));
        assert_eq!(value["timezoneOffset"], json!(120));
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let request: SubmissionRequest = serde_json::from_value(json!({
            "message": "hi",
            "deviceInfo": {
                "userAgent": "ua",
                "platform": "linux",
                "screenResolution": "unknown",
                "language": "en"
            },
            "timezone": "UTC",
            "timezoneOffset": 0,
            "languages": ["en"]
        }))
        .unwrap();

        assert!(request.audio_data.is_none());
        assert!(request.image_data.is_none());
        assert!(!request.location_precise);
        assert!(request.location_coords.is_none());
    }

    #[test]
    fn ack_round_trips() {
        let ack = SubmissionAck {
            success: true,
            id: "0b5c9d3e".to_string(),
            location: LocationSummary {
                city: Some("Berlin".to_string()),
                country: Some("Germany".to_string()),
                source: "gps".to_string(),
            },
        };
        let text = serde_json::to_string(&ack).unwrap();
        let parsed: SubmissionAck = serde_json::from_str(&text).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.location.source, "gps");
    }
}
