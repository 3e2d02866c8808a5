//! Service layer for the ingest gateway
//!
//! External lookups (network geolocation, reverse geocoding), media
//! storage, and trust scoring.

pub mod ip_lookup;
pub mod media_store;
pub mod reverse_geocode;
pub mod trust_scorer;

pub use ip_lookup::{IpLookupClient, NetworkGeo};
pub use media_store::{Bucket, MediaStore};
pub use reverse_geocode::ReverseGeocodeClient;
pub use trust_scorer::{TrustFlag, TrustSignals};
