//! Database access for txp-ig

pub mod submissions;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to `txp.db` under the root folder, creating it on first run.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize gateway tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            message TEXT NOT NULL,
            audio_url TEXT,
            audio_duration_seconds INTEGER,
            image_url TEXT,
            contact_email TEXT,
            contact_social TEXT,
            location_precise INTEGER NOT NULL DEFAULT 0,
            location_coords TEXT,
            location_city TEXT,
            location_region TEXT,
            location_country TEXT,
            location_country_code TEXT,
            location_source TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            ip_is_vpn INTEGER NOT NULL DEFAULT 0,
            ip_is_datacenter INTEGER NOT NULL DEFAULT 0,
            ip_isp TEXT,
            device_info TEXT NOT NULL,
            timezone TEXT NOT NULL,
            timezone_offset INTEGER NOT NULL,
            languages TEXT NOT NULL,
            consistency_score INTEGER NOT NULL,
            trust_flags TEXT,
            status TEXT NOT NULL DEFAULT 'unread',
            admin_notes TEXT,
            is_spam INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (submissions)");

    Ok(())
}
