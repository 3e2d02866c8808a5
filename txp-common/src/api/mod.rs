//! Shared API types for the submission wire contract

pub mod types;

pub use types::{
    DeviceInfo, ErrorBody, GeoCoords, LocationSummary, SubmissionAck, SubmissionRequest,
};
