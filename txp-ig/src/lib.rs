//! txp-ig library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::services::{IpLookupClient, MediaStore, ReverseGeocodeClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Private media store with signed references
    pub media: MediaStore,
    /// Network-address geolocation client
    pub ip_lookup: Arc<IpLookupClient>,
    /// Reverse geocoding client
    pub reverse_geocode: Arc<ReverseGeocodeClient>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        media: MediaStore,
        ip_lookup: IpLookupClient,
        reverse_geocode: ReverseGeocodeClient,
    ) -> Self {
        Self {
            db,
            media,
            ip_lookup: Arc::new(ip_lookup),
            reverse_geocode: Arc::new(reverse_geocode),
            startup_time: Utc::now(),
        }
    }

    /// Assemble state from a resolved configuration and root folder
    pub fn from_config(
        db: SqlitePool,
        root: &std::path::Path,
        config: &GatewayConfig,
    ) -> anyhow::Result<Self> {
        let media = MediaStore::new(
            root,
            config.media_secret.clone(),
            config.media_url_ttl_seconds,
        );
        let ip_lookup = IpLookupClient::new(config.ip_lookup_url.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create IP lookup client: {}", e))?;
        let reverse_geocode = ReverseGeocodeClient::new(config.reverse_geocode_url.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create reverse geocode client: {}", e))?;
        Ok(Self::new(db, media, ip_lookup, reverse_geocode))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::contact_routes())
        .merge(api::media_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
