//! Trust scorer
//!
//! Computes the location consistency score for a submission: a bounded
//! 0..=4 integer plus a set of anomaly flags, from the two location
//! descriptors and the client-reported timezone and language signals.
//!
//! # Scoring Algorithm
//! Four independent checks, each worth at most one point, starting at zero:
//! 1. **Geo agreement**: device country vs network country (skipped, and
//!    awarded, when no device country exists)
//! 2. **Timezone plausibility**: timezone region vs network country
//! 3. **Language plausibility**: primary language tag vs network country
//! 4. **Baseline**: always awarded; VPN/datacenter anomalies surface as
//!    separate flags appended by the caller, not as score deductions
//!
//! The tables are a small hand-curated heuristic for manual triage, not a
//! geo-IP database; no submission is ever rejected based on the score.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum attainable score
pub const MAX_SCORE: i64 = 4;

/// Anomaly flags raised by the scorer and the network-origin lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustFlag {
    GpsIpCountryMismatch,
    TimezoneMismatch,
    LanguageMismatch,
    VpnDetected,
    DatacenterIp,
}

impl TrustFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustFlag::GpsIpCountryMismatch => "gps_ip_country_mismatch",
            TrustFlag::TimezoneMismatch => "timezone_mismatch",
            TrustFlag::LanguageMismatch => "language_mismatch",
            TrustFlag::VpnDetected => "vpn_detected",
            TrustFlag::DatacenterIp => "datacenter_ip",
        }
    }
}

/// Scorer output: bounded score plus raised flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustSignals {
    /// Consistency score, always in 0..=4
    pub score: i64,
    pub flags: Vec<TrustFlag>,
}

/// Country codes typically found under each timezone region prefix
/// (the segment before the first `/`).
fn timezone_country_hints(region: &str) -> &'static [&'static str] {
    match region {
        "America" => &["US", "CA", "MX", "BR", "AR"],
        "Europe" => &["GB", "DE", "FR", "IT", "ES", "NL", "PL"],
        "Asia" => &["IN", "CN", "JP", "KR", "SG", "ID", "TH"],
        "Australia" => &["AU", "NZ"],
        "Africa" => &["ZA", "NG", "EG", "KE"],
        _ => &[],
    }
}

/// Likely country codes for a language tag. Exact tags take precedence
/// over bare language subtags.
fn language_country_hints(tag: &str) -> &'static [&'static str] {
    match tag {
        "en-US" => &["US"],
        "en-GB" => &["GB"],
        "en-IN" => &["IN"],
        "de" => &["DE", "AT", "CH"],
        "fr" => &["FR", "CA", "BE"],
        "es" => &["ES", "MX", "AR"],
        "pt" => &["PT", "BR"],
        "ja" => &["JP"],
        "zh" => &["CN", "TW", "HK"],
        "ko" => &["KR"],
        _ => &[],
    }
}

/// Compute the consistency score and flags.
///
/// Pure function: identical inputs always produce identical output.
/// `vpn_detected` / `datacenter_ip` are appended by the ingestion handler
/// from the network-origin lookup, not here.
pub fn score(
    network_country_code: Option<&str>,
    device_country_code: Option<&str>,
    timezone: &str,
    languages: &[String],
) -> TrustSignals {
    let mut score = 0i64;
    let mut flags = Vec::new();

    // Check 1: device vs network country (skipped when no device country)
    match (device_country_code, network_country_code) {
        (Some(device), Some(network)) => {
            if device == network {
                score += 1;
            } else {
                flags.push(TrustFlag::GpsIpCountryMismatch);
            }
        }
        _ => score += 1,
    }

    // Check 2: timezone region vs network country
    let region = timezone.split('/').next().unwrap_or("");
    let expected = timezone_country_hints(region);
    match network_country_code {
        Some(network) if !expected.is_empty() => {
            if expected.contains(&network) {
                score += 1;
            } else {
                flags.push(TrustFlag::TimezoneMismatch);
            }
        }
        _ => score += 1,
    }

    // Check 3: primary language vs network country
    let full_tag = languages.first().map(String::as_str).unwrap_or("");
    let bare_tag = full_tag.split('-').next().unwrap_or("");
    let expected = {
        let exact = language_country_hints(full_tag);
        if exact.is_empty() {
            language_country_hints(bare_tag)
        } else {
            exact
        }
    };
    match network_country_code {
        Some(network) if !expected.is_empty() => {
            if expected.contains(&network) {
                score += 1;
            } else {
                flags.push(TrustFlag::LanguageMismatch);
            }
        }
        _ => score += 1,
    }

    // Check 4: baseline point; VPN/datacenter surface as caller-side flags
    score += 1;

    debug!(score, flags = ?flags, "Consistency score computed");

    TrustSignals { score, flags }
}
