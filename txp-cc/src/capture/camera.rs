//! Live still-image capture
//!
//! Capture runs a fixed-priority fallback chain over a [`CameraBackend`]:
//! a dedicated single-frame still primitive first, then a pixel-surface
//! readback as an encoded blob, then the same readback materialized as a
//! data-URL string. Restrictive platform configurations silently degrade
//! the readback paths into blank or undersized frames, so each strategy
//! validates its output and a bad frame falls through to the next strategy
//! instead of being accepted.
//!
//! The camera handle is released on success, on cancel, and after an
//! exhausted chain; never left open across a submission.

use crate::error::CaptureError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Seconds counted down before the frame is taken
pub const COUNTDOWN_SECONDS: u32 = 3;

/// A readback below this size is a blank/degraded frame, not a photo
const MIN_FRAME_BYTES: usize = 1000;
/// Minimum plausible data-URL length for a real image
const MIN_DATA_URL_LEN: usize = 100;

/// Captured still image, transport-ready as a data URL
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub data_url: String,
}

/// Why one strategy did not produce a usable frame
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The backend has no such primitive
    #[error("not supported")]
    Unsupported,

    /// The primitive ran but produced nothing usable
    #[error("{0}")]
    Failed(String),
}

/// Platform camera seam.
///
/// `open` acquires the device (refusal maps to the disabled-feature state);
/// the three read paths mirror the capture strategies; `release` must be
/// idempotent.
pub trait CameraBackend {
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Dedicated single-frame still-image primitive
    fn take_photo(&mut self) -> Result<Vec<u8>, StrategyError>;

    /// Pixel-surface readback as an encoded JPEG blob
    fn frame_jpeg(&mut self) -> Result<Vec<u8>, StrategyError>;

    /// Pixel-surface readback, immediately materialized as a data URL
    fn frame_data_url(&mut self) -> Result<String, StrategyError>;

    fn release(&mut self);
}

/// One named entry in the fallback chain
struct CaptureStrategy {
    name: &'static str,
    run: fn(&mut dyn CameraBackend) -> Result<ImageArtifact, StrategyError>,
}

/// The fixed-priority chain; order is part of the contract
const STRATEGIES: [CaptureStrategy; 3] = [
    CaptureStrategy {
        name: "still-photo",
        run: run_still_photo,
    },
    CaptureStrategy {
        name: "frame-blob",
        run: run_frame_blob,
    },
    CaptureStrategy {
        name: "frame-data-url",
        run: run_frame_data_url,
    },
];

fn run_still_photo(backend: &mut dyn CameraBackend) -> Result<ImageArtifact, StrategyError> {
    let bytes = backend.take_photo()?;
    validate_frame(&bytes)?;
    Ok(ImageArtifact {
        data_url: to_data_url(&bytes),
    })
}

fn run_frame_blob(backend: &mut dyn CameraBackend) -> Result<ImageArtifact, StrategyError> {
    let bytes = backend.frame_jpeg()?;
    validate_frame(&bytes)?;
    Ok(ImageArtifact {
        data_url: to_data_url(&bytes),
    })
}

fn run_frame_data_url(backend: &mut dyn CameraBackend) -> Result<ImageArtifact, StrategyError> {
    let data_url = backend.frame_data_url()?;
    if data_url.len() < MIN_DATA_URL_LEN || data_url.starts_with("data:,") {
        return Err(StrategyError::Failed("blank data URL".to_string()));
    }
    Ok(ImageArtifact { data_url })
}

/// Reject undersized or non-JPEG readbacks
fn validate_frame(bytes: &[u8]) -> Result<(), StrategyError> {
    if bytes.len() < MIN_FRAME_BYTES {
        return Err(StrategyError::Failed(format!(
            "frame too small ({} bytes)",
            bytes.len()
        )));
    }
    if bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err(StrategyError::Failed("not a JPEG frame".to_string()));
    }
    Ok(())
}

fn to_data_url(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}

/// Try each strategy in order and accept the first success.
///
/// The device is released before returning, on every path. When the whole
/// chain is exhausted the error carries guidance for the sender rather than
/// a silent empty image.
pub fn capture(backend: &mut dyn CameraBackend) -> Result<ImageArtifact, CaptureError> {
    for strategy in &STRATEGIES {
        match (strategy.run)(backend) {
            Ok(artifact) => {
                info!(strategy = strategy.name, "Image captured");
                backend.release();
                return Ok(artifact);
            }
            Err(e) => {
                debug!(strategy = strategy.name, error = %e, "Capture strategy failed, trying next");
            }
        }
    }

    backend.release();
    Err(CaptureError::CaptureFailed(
        "Could not capture an image. Check that the camera is connected, not in use by \
         another application, and that capture helpers are configured \
         (camera_still_command / camera_frame_command in config.toml). You can also \
         submit without a selfie."
            .to_string(),
    ))
}

/// Run the pre-capture countdown, invoking `on_tick` with the remaining
/// seconds. Dropping the returned future cancels the countdown; no timer
/// outlives the caller.
pub async fn run_countdown(mut on_tick: impl FnMut(u32)) {
    for remaining in (1..=COUNTDOWN_SECONDS).rev() {
        on_tick(remaining);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Camera backend driving operator-configured external grabber commands.
///
/// `still_command` maps to the dedicated still primitive; `frame_command`
/// feeds both readback strategies. Each capture runs a short-lived child
/// process, so release has nothing to hold open.
pub struct CommandBackend {
    still_command: Option<String>,
    frame_command: Option<String>,
    opened: bool,
}

impl CommandBackend {
    pub fn new(still_command: Option<String>, frame_command: Option<String>) -> Self {
        Self {
            still_command,
            frame_command,
            opened: false,
        }
    }

    fn run_command(command: &str) -> Result<Vec<u8>, StrategyError> {
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| StrategyError::Failed(format!("command failed to run: {}", e)))?;
        if !output.status.success() {
            return Err(StrategyError::Failed(format!(
                "command exited with {}",
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

impl CameraBackend for CommandBackend {
    fn open(&mut self) -> Result<(), CaptureError> {
        if self.still_command.is_none() && self.frame_command.is_none() {
            return Err(CaptureError::PermissionDenied(
                "No camera capture helper configured".to_string(),
            ));
        }
        self.opened = true;
        Ok(())
    }

    fn take_photo(&mut self) -> Result<Vec<u8>, StrategyError> {
        if !self.opened {
            return Err(StrategyError::Failed("camera not opened".to_string()));
        }
        let command = self.still_command.as_ref().ok_or(StrategyError::Unsupported)?;
        Self::run_command(command)
    }

    fn frame_jpeg(&mut self) -> Result<Vec<u8>, StrategyError> {
        if !self.opened {
            return Err(StrategyError::Failed("camera not opened".to_string()));
        }
        let command = self.frame_command.as_ref().ok_or(StrategyError::Unsupported)?;
        Self::run_command(command)
    }

    fn frame_data_url(&mut self) -> Result<String, StrategyError> {
        self.frame_jpeg().map(|bytes| to_data_url(&bytes))
    }

    fn release(&mut self) {
        self.opened = false;
    }
}
