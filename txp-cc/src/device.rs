//! Device and locale signal snapshot
//!
//! Read-only, always-available signals sent alongside a submission:
//! synthesized user-agent, platform, terminal dimensions standing in for a
//! screen resolution, the ordered language preference list from the locale
//! environment, and the IANA timezone name with its offset.

use chrono::{Local, Offset};
use txp_common::api::types::DeviceInfo;

const USER_AGENT: &str = concat!("txp-cc/", env!("CARGO_PKG_VERSION"));

/// Everything the orchestrator snapshots in one call
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    pub device_info: DeviceInfo,
    pub timezone: String,
    /// Local minus UTC, in minutes (east positive)
    pub timezone_offset: i64,
    pub languages: Vec<String>,
}

/// Snapshot the current environment. Never fails; unknown values are
/// reported as such rather than omitted.
pub fn snapshot() -> DeviceSnapshot {
    let languages = language_preferences(
        std::env::var("LANGUAGE").ok().as_deref(),
        std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .ok()
            .as_deref(),
    );
    let language = languages
        .first()
        .cloned()
        .unwrap_or_else(|| "en".to_string());

    let timezone = timezone_name(
        std::env::var("TZ").ok().as_deref(),
        std::fs::read_to_string("/etc/timezone").ok().as_deref(),
    );
    let timezone_offset = Local::now().offset().fix().local_minus_utc() as i64 / 60;

    DeviceSnapshot {
        device_info: DeviceInfo {
            user_agent: format!(
                "{} ({}; {})",
                USER_AGENT,
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            platform: std::env::consts::OS.to_string(),
            screen_resolution: screen_resolution(
                std::env::var("COLUMNS").ok().as_deref(),
                std::env::var("LINES").ok().as_deref(),
            ),
            language,
        },
        timezone,
        timezone_offset,
        languages,
    }
}

/// Build the ordered preference list from `LANGUAGE` (colon-separated) with
/// `LC_ALL`/`LANG` as the single-entry fallback.
fn language_preferences(language_var: Option<&str>, lang_var: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = language_var
        .unwrap_or("")
        .split(':')
        .filter_map(normalize_locale)
        .collect();

    if tags.is_empty() {
        if let Some(tag) = lang_var.and_then(normalize_locale) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        tags.push("en".to_string());
    }
    tags
}

/// `de_DE.UTF-8` → `de-DE`; `C`/`POSIX`/empty are dropped
fn normalize_locale(raw: &str) -> Option<String> {
    let base = raw.split('.').next().unwrap_or("").trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn timezone_name(tz_var: Option<&str>, etc_timezone: Option<&str>) -> String {
    if let Some(tz) = tz_var {
        let tz = tz.trim_start_matches(':').trim();
        if !tz.is_empty() {
            return tz.to_string();
        }
    }
    if let Some(contents) = etc_timezone {
        let tz = contents.trim();
        if !tz.is_empty() {
            return tz.to_string();
        }
    }
    "UTC".to_string()
}

fn screen_resolution(columns: Option<&str>, lines: Option<&str>) -> String {
    match (columns, lines) {
        (Some(c), Some(l)) if !c.is_empty() && !l.is_empty() => format!("{}x{}", c, l),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_normalization() {
        assert_eq!(normalize_locale("de_DE.UTF-8"), Some("de-DE".to_string()));
        assert_eq!(normalize_locale("en_US"), Some("en-US".to_string()));
        assert_eq!(normalize_locale("ja"), Some("ja".to_string()));
        assert_eq!(normalize_locale("C"), None);
        assert_eq!(normalize_locale("POSIX"), None);
        assert_eq!(normalize_locale(""), None);
    }

    #[test]
    fn language_list_prefers_colon_separated_variable() {
        let tags = language_preferences(Some("de_DE.UTF-8:en_US:C"), Some("fr_FR.UTF-8"));
        assert_eq!(tags, vec!["de-DE", "en-US"]);
    }

    #[test]
    fn language_list_falls_back_to_lang_then_english() {
        assert_eq!(
            language_preferences(None, Some("fr_FR.UTF-8")),
            vec!["fr-FR"]
        );
        assert_eq!(language_preferences(None, None), vec!["en"]);
        assert_eq!(language_preferences(Some("C"), Some("POSIX")), vec!["en"]);
    }

    #[test]
    fn timezone_resolution_order() {
        assert_eq!(
            timezone_name(Some(":Europe/Berlin"), Some("Asia/Tokyo\n")),
            "Europe/Berlin"
        );
        assert_eq!(timezone_name(None, Some("Asia/Tokyo\n")), "Asia/Tokyo");
        assert_eq!(timezone_name(None, None), "UTC");
        assert_eq!(timezone_name(Some(""), None), "UTC");
    }

    #[test]
    fn screen_resolution_formats_or_reports_unknown() {
        assert_eq!(screen_resolution(Some("80"), Some("24")), "80x24");
        assert_eq!(screen_resolution(None, Some("24")), "unknown");
    }

    #[test]
    fn snapshot_always_produces_signals() {
        let snap = snapshot();
        assert!(snap.device_info.user_agent.starts_with("txp-cc/"));
        assert!(!snap.device_info.platform.is_empty());
        assert!(!snap.languages.is_empty());
        assert!(!snap.timezone.is_empty());
    }
}
