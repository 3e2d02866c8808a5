//! Data models for the ingest gateway

pub mod submission;

pub use submission::{
    LocationDescriptor, LocationSource, ModerationStatus, NetworkOrigin, Submission,
};
