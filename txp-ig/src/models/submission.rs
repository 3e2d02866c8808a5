//! Submission record and location types
//!
//! The `Submission` struct is the durable record of one contact attempt.
//! It is assembled once at ingestion time and is immutable afterwards except
//! for the moderation fields, which belong to the (out-of-process) admin
//! surface and are only defaulted here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use txp_common::api::types::{DeviceInfo, GeoCoords};
use uuid::Uuid;

/// Provenance of the resolved location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Device-sensor coordinates, reverse-geocoded
    Gps,
    /// Inferred from the sender's network address
    Ip,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Gps => "gps",
            LocationSource::Ip => "ip",
        }
    }
}

/// Moderation state of a submission. The pipeline only ever writes `Unread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Unread,
    Read,
    Replied,
    Archived,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Unread => "unread",
            ModerationStatus::Read => "read",
            ModerationStatus::Replied => "replied",
            ModerationStatus::Archived => "archived",
        }
    }
}

/// Normalized place descriptor produced by either geolocation strategy.
///
/// Every field is independently nullable; a lookup that fails entirely
/// yields the all-null descriptor rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LocationDescriptor {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl LocationDescriptor {
    /// The all-null descriptor used when a lookup fails closed
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Network-origin block: the sender's address plus provider-reported
/// anomaly indicators.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkOrigin {
    pub address: String,
    pub is_vpn: bool,
    pub is_datacenter: bool,
    pub isp: Option<String>,
}

/// The durable record of one contact attempt
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    // Content
    pub message: String,
    pub audio_url: Option<String>,
    pub audio_duration_seconds: Option<i64>,
    pub image_url: Option<String>,

    // Contact (optional, unverified)
    pub contact_email: Option<String>,
    pub contact_social: Option<String>,

    // Location
    pub location_precise: bool,
    pub location_coords: Option<GeoCoords>,
    pub location: LocationDescriptor,
    pub location_source: LocationSource,

    // Network origin
    pub network: NetworkOrigin,

    // Device & browser signals
    pub device_info: DeviceInfo,
    pub timezone: String,
    pub timezone_offset: i64,
    pub languages: Vec<String>,

    // Trust signals
    pub consistency_score: i64,
    pub trust_flags: Vec<String>,

    // Moderation (defaulted; mutated only by the admin surface)
    pub status: ModerationStatus,
    pub admin_notes: Option<String>,
    pub is_spam: bool,
}

impl Submission {
    /// Create a new record with a fresh id, the current timestamp, and
    /// defaulted moderation fields. All pipeline-derived fields are passed
    /// in by the ingestion handler.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message: String,
        audio_url: Option<String>,
        audio_duration_seconds: Option<i64>,
        image_url: Option<String>,
        contact_email: Option<String>,
        contact_social: Option<String>,
        location_precise: bool,
        location_coords: Option<GeoCoords>,
        location: LocationDescriptor,
        location_source: LocationSource,
        network: NetworkOrigin,
        device_info: DeviceInfo,
        timezone: String,
        timezone_offset: i64,
        languages: Vec<String>,
        consistency_score: i64,
        trust_flags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            message,
            audio_url,
            audio_duration_seconds,
            image_url,
            contact_email,
            contact_social,
            location_precise,
            location_coords,
            location,
            location_source,
            network,
            device_info,
            timezone,
            timezone_offset,
            languages,
            consistency_score,
            trust_flags,
            status: ModerationStatus::Unread,
            admin_notes: None,
            is_spam: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceInfo {
        DeviceInfo {
            user_agent: "ua".to_string(),
            platform: "linux".to_string(),
            screen_resolution: "unknown".to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn new_submission_defaults_moderation_fields() {
        let submission = Submission::new(
            "hello".to_string(),
            None,
            None,
            None,
            None,
            None,
            false,
            None,
            LocationDescriptor::empty(),
            LocationSource::Ip,
            NetworkOrigin {
                address: "unknown".to_string(),
                is_vpn: false,
                is_datacenter: false,
                isp: None,
            },
            device(),
            "UTC".to_string(),
            0,
            vec!["en".to_string()],
            4,
            Vec::new(),
        );

        assert_eq!(submission.status, ModerationStatus::Unread);
        assert!(submission.admin_notes.is_none());
        assert!(!submission.is_spam);
        assert_eq!(submission.location_source.as_str(), "ip");
    }

    #[test]
    fn location_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LocationSource::Gps).unwrap(),
            "\"gps\""
        );
        assert_eq!(serde_json::to_string(&LocationSource::Ip).unwrap(), "\"ip\"");
    }
}
