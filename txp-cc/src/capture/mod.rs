//! Capture subsystem: voice notes and live still images

pub mod audio;
pub mod camera;

pub use audio::{AudioArtifact, AudioRecorder, MAX_DURATION_SECONDS};
pub use camera::{capture, CameraBackend, CommandBackend, ImageArtifact};
