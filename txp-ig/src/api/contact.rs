//! Contact submission endpoint
//!
//! `POST /contact` runs the full ingestion pipeline: validate, derive the
//! network origin, persist media, resolve location from both strategies,
//! score consistency, and write the record. Everything between validation
//! and the record write is best-effort enrichment; only the final insert
//! can fail the request.

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use std::net::SocketAddr;
use tracing::{error, info};
use txp_common::api::types::{LocationSummary, SubmissionAck, SubmissionRequest};

use crate::error::{ApiError, ApiResult};
use crate::models::{LocationDescriptor, LocationSource, NetworkOrigin, Submission};
use crate::services::trust_scorer::{self, TrustFlag};
use crate::services::Bucket;
use crate::AppState;

/// Hard ceiling on a voice note, in seconds
const MAX_AUDIO_DURATION_SECONDS: i64 = 60;

/// POST /contact
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<SubmissionRequest>,
) -> ApiResult<Json<SubmissionAck>> {
    // Validation happens before any side effect
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    let address = client_address(&headers, connect_info.map(|ci| ci.0));

    // Media stores and both geolocation lookups are independent external
    // calls; issue them concurrently and join before scoring.
    let audio_store = async {
        match payload.audio_data.as_deref() {
            Some(data) => state.media.store(Bucket::Audio, data, "wav").await,
            None => None,
        }
    };
    let image_store = async {
        match payload.image_data.as_deref() {
            Some(data) => state.media.store(Bucket::Images, data, "jpg").await,
            None => None,
        }
    };
    let network_lookup = state.ip_lookup.lookup(&address);
    let reverse_lookup = async {
        match (payload.location_precise, payload.location_coords) {
            (true, Some(coords)) => state.reverse_geocode.lookup(coords.lat, coords.lng).await,
            _ => LocationDescriptor::empty(),
        }
    };

    let (audio_url, image_url, network_geo, device_location) =
        tokio::join!(audio_store, image_store, network_lookup, reverse_lookup);

    // Device-derived location wins only when precise mode was requested and
    // the reverse lookup actually produced a city.
    let (location, location_source) = if payload.location_precise && device_location.city.is_some()
    {
        (device_location.clone(), LocationSource::Gps)
    } else {
        (network_geo.location.clone(), LocationSource::Ip)
    };

    let signals = trust_scorer::score(
        network_geo.location.country_code.as_deref(),
        device_location.country_code.as_deref(),
        &payload.timezone,
        &payload.languages,
    );
    let mut trust_flags: Vec<String> = signals
        .flags
        .iter()
        .map(|f| f.as_str().to_string())
        .collect();
    if network_geo.is_vpn {
        trust_flags.push(TrustFlag::VpnDetected.as_str().to_string());
    }
    if network_geo.is_datacenter {
        trust_flags.push(TrustFlag::DatacenterIp.as_str().to_string());
    }

    // The duration ceiling is a record invariant; a hostile client gets
    // clamped, not rejected.
    let audio_duration = payload
        .audio_duration
        .map(|d| d.clamp(0, MAX_AUDIO_DURATION_SECONDS));

    let submission = Submission::new(
        message,
        audio_url,
        audio_duration,
        image_url,
        payload.contact_email,
        payload.contact_social,
        payload.location_precise,
        payload.location_coords,
        location,
        location_source,
        NetworkOrigin {
            address,
            is_vpn: network_geo.is_vpn,
            is_datacenter: network_geo.is_datacenter,
            isp: network_geo.isp,
        },
        payload.device_info,
        payload.timezone,
        payload.timezone_offset,
        payload.languages,
        signals.score,
        trust_flags,
    );

    // Single durable commit point; the only 500 path.
    if let Err(e) = crate::db::submissions::insert_submission(&state.db, &submission).await {
        error!(
            submission_id = %submission.id,
            error = %e,
            "Submission insert failed"
        );
        return Err(ApiError::Database(e));
    }

    info!(
        submission_id = %submission.id,
        source = submission.location_source.as_str(),
        score = submission.consistency_score,
        has_audio = submission.audio_url.is_some(),
        has_image = submission.image_url.is_some(),
        "Submission persisted"
    );

    Ok(Json(SubmissionAck {
        success: true,
        id: submission.id.to_string(),
        location: LocationSummary {
            city: submission.location.city.clone(),
            country: submission.location.country.clone(),
            source: submission.location_source.as_str().to_string(),
        },
    }))
}

/// Derive the sender's network address: first forwarded-for entry, then
/// x-real-ip, then the direct peer, else "unknown".
fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Build contact routes
pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(submit_contact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_first_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_address(&headers, None), "203.0.113.7");
    }

    #[test]
    fn real_ip_is_second_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_address(&headers, None), "198.51.100.2");
    }

    #[test]
    fn peer_address_then_unknown() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.9:443".parse().unwrap();
        assert_eq!(client_address(&headers, Some(peer)), "192.0.2.9");
        assert_eq!(client_address(&headers, None), "unknown");
    }
}
