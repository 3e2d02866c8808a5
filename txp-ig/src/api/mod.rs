//! HTTP API handlers for txp-ig

pub mod contact;
pub mod health;
pub mod media;

pub use contact::contact_routes;
pub use health::health_routes;
pub use media::media_routes;
