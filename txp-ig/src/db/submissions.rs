//! Submission persistence
//!
//! One insert per ingestion call; the insert is the pipeline's single
//! durable commit point. Rows are immutable here; moderation mutations
//! belong to the admin surface.

use crate::models::{
    LocationDescriptor, LocationSource, ModerationStatus, NetworkOrigin, Submission,
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use txp_common::api::types::{DeviceInfo, GeoCoords};
use uuid::Uuid;

/// Persist a submission record
pub async fn insert_submission(pool: &SqlitePool, submission: &Submission) -> sqlx::Result<()> {
    let coords_json = submission
        .location_coords
        .as_ref()
        .map(|c| serde_json::to_string(c).unwrap_or_default());
    let device_json =
        serde_json::to_string(&submission.device_info).unwrap_or_else(|_| "{}".to_string());
    let languages_json =
        serde_json::to_string(&submission.languages).unwrap_or_else(|_| "[]".to_string());
    // Stored as NULL when no flag was raised
    let flags_json = if submission.trust_flags.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&submission.trust_flags).unwrap_or_else(|_| "[]".to_string()))
    };

    sqlx::query(
        r#"
        INSERT INTO submissions (
            id, created_at, message,
            audio_url, audio_duration_seconds, image_url,
            contact_email, contact_social,
            location_precise, location_coords,
            location_city, location_region, location_country, location_country_code,
            location_source,
            ip_address, ip_is_vpn, ip_is_datacenter, ip_isp,
            device_info, timezone, timezone_offset, languages,
            consistency_score, trust_flags,
            status, admin_notes, is_spam
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.id.to_string())
    .bind(submission.created_at.to_rfc3339())
    .bind(&submission.message)
    .bind(&submission.audio_url)
    .bind(submission.audio_duration_seconds)
    .bind(&submission.image_url)
    .bind(&submission.contact_email)
    .bind(&submission.contact_social)
    .bind(submission.location_precise)
    .bind(coords_json)
    .bind(&submission.location.city)
    .bind(&submission.location.region)
    .bind(&submission.location.country)
    .bind(&submission.location.country_code)
    .bind(submission.location_source.as_str())
    .bind(&submission.network.address)
    .bind(submission.network.is_vpn)
    .bind(submission.network.is_datacenter)
    .bind(&submission.network.isp)
    .bind(device_json)
    .bind(&submission.timezone)
    .bind(submission.timezone_offset)
    .bind(languages_json)
    .bind(submission.consistency_score)
    .bind(flags_json)
    .bind(submission.status.as_str())
    .bind(&submission.admin_notes)
    .bind(submission.is_spam)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a submission by id
pub async fn get_submission(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Submission>> {
    let row = sqlx::query("SELECT * FROM submissions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let coords: Option<GeoCoords> = row
        .get::<Option<String>, _>("location_coords")
        .and_then(|json| serde_json::from_str(&json).ok());
    let device_info: DeviceInfo = serde_json::from_str(&row.get::<String, _>("device_info"))
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "device_info".to_string(),
            source: Box::new(e),
        })?;
    let languages: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("languages")).unwrap_or_default();
    let trust_flags: Vec<String> = row
        .get::<Option<String>, _>("trust_flags")
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    let location_source = match row.get::<String, _>("location_source").as_str() {
        "gps" => LocationSource::Gps,
        _ => LocationSource::Ip,
    };
    let status = match row.get::<String, _>("status").as_str() {
        "read" => ModerationStatus::Read,
        "replied" => ModerationStatus::Replied,
        "archived" => ModerationStatus::Archived,
        _ => ModerationStatus::Unread,
    };

    let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Some(Submission {
        id,
        created_at,
        message: row.get("message"),
        audio_url: row.get("audio_url"),
        audio_duration_seconds: row.get("audio_duration_seconds"),
        image_url: row.get("image_url"),
        contact_email: row.get("contact_email"),
        contact_social: row.get("contact_social"),
        location_precise: row.get("location_precise"),
        location_coords: coords,
        location: LocationDescriptor {
            city: row.get("location_city"),
            region: row.get("location_region"),
            country: row.get("location_country"),
            country_code: row.get("location_country_code"),
        },
        location_source,
        network: NetworkOrigin {
            address: row.get("ip_address"),
            is_vpn: row.get("ip_is_vpn"),
            is_datacenter: row.get("ip_is_datacenter"),
            isp: row.get("ip_isp"),
        },
        device_info,
        timezone: row.get("timezone"),
        timezone_offset: row.get("timezone_offset"),
        languages,
        consistency_score: row.get("consistency_score"),
        trust_flags,
        status,
        admin_notes: row.get("admin_notes"),
        is_spam: row.get("is_spam"),
    }))
}

/// Count all submissions (used by tests to assert side-effect freedom)
pub async fn count_submissions(pool: &SqlitePool) -> sqlx::Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM submissions")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Submission;

    async fn memory_pool() -> SqlitePool {
        // Single connection: every pooled connection would otherwise get its
        // own private in-memory database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn sample_submission() -> Submission {
        Submission::new(
            "hello there".to_string(),
            Some("/media/audio/1-abc.wav?expires=1&sig=f".to_string()),
            Some(12),
            None,
            Some("a@b.c".to_string()),
            None,
            true,
            Some(GeoCoords {
                lat: 52.52,
                lng: 13.405,
                accuracy: 20.0,
            }),
            LocationDescriptor {
                city: Some("Berlin".to_string()),
                region: Some("Berlin".to_string()),
                country: Some("Germany".to_string()),
                country_code: Some("DE".to_string()),
            },
            LocationSource::Gps,
            NetworkOrigin {
                address: "203.0.113.7".to_string(),
                is_vpn: false,
                is_datacenter: true,
                isp: Some("Example ISP".to_string()),
            },
            DeviceInfo {
                user_agent: "txp-cc/0.1.0".to_string(),
                platform: "linux".to_string(),
                screen_resolution: "80x24".to_string(),
                language: "de".to_string(),
            },
            "Europe/Berlin".to_string(),
            120,
            vec!["de".to_string(), "en".to_string()],
            4,
            vec!["datacenter_ip".to_string()],
        )
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips() {
        let pool = memory_pool().await;
        let submission = sample_submission();

        insert_submission(&pool, &submission).await.unwrap();
        let fetched = get_submission(&pool, submission.id).await.unwrap().unwrap();

        assert_eq!(fetched.message, "hello there");
        assert_eq!(fetched.audio_duration_seconds, Some(12));
        assert_eq!(fetched.location_source, LocationSource::Gps);
        assert_eq!(fetched.location.city.as_deref(), Some("Berlin"));
        assert_eq!(fetched.network.address, "203.0.113.7");
        assert!(fetched.network.is_datacenter);
        assert_eq!(fetched.trust_flags, vec!["datacenter_ip".to_string()]);
        assert_eq!(fetched.status, ModerationStatus::Unread);
        assert_eq!(
            fetched.location_coords.map(|c| c.lat),
            Some(52.52)
        );
    }

    #[tokio::test]
    async fn empty_trust_flags_stored_as_null() {
        let pool = memory_pool().await;
        let mut submission = sample_submission();
        submission.trust_flags = Vec::new();

        insert_submission(&pool, &submission).await.unwrap();

        let raw: Option<String> = sqlx::query("SELECT trust_flags FROM submissions WHERE id = ?")
            .bind(submission.id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("trust_flags");
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn missing_row_yields_none() {
        let pool = memory_pool().await;
        assert!(get_submission(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
