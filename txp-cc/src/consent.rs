//! Consent gate
//!
//! A small state machine that intercepts submission, discloses exactly what
//! contextual metadata will leave the device, and lets the sender pick
//! precise (device-sensor) or approximate (network-inferred) location; or
//! cancel, which aborts the submission before any network call.
//!
//! The gate is an explicit value handed to the orchestrator, not ambient
//! shared state. Location is best-effort and never blocking: the precise
//! request waits at most [`LOCATE_TIMEOUT`] and degrades silently to
//! network resolution on timeout or denial.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use txp_common::api::types::GeoCoords;

/// Bounded wait for the device location sensor
pub const LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

/// The metadata categories disclosed before submission
pub const DISCLOSED_CATEGORIES: [&str; 4] = ["Location", "Device info", "Timezone", "Language"];

/// The sender's choice at the consent step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Precise,
    Approximate,
    Cancelled,
}

/// Gate phases; transitions are linear and single-use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Disclosing,
    PreciseRequested,
    ApproximateRequested,
    Cancelled,
    Resolved,
}

/// What the gate hands to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Proceed with submission; `attempt_precise` asks for a device fix
    Proceed { attempt_precise: bool },
    /// Abort the submission with no network call
    Cancelled,
}

/// Invalid gate transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Consent gate requires a non-empty message")]
    EmptyMessage,

    #[error("Invalid gate transition from {0:?}")]
    InvalidTransition(GatePhase),
}

/// One-shot consent state machine
#[derive(Debug)]
pub struct ConsentGate {
    phase: GatePhase,
}

impl ConsentGate {
    pub fn new() -> Self {
        Self {
            phase: GatePhase::Idle,
        }
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Enter the disclosure phase. Only reachable on a submit attempt with
    /// a non-empty message; returns the categories to present.
    pub fn begin(&mut self, message: &str) -> Result<&'static [&'static str], GateError> {
        if self.phase != GatePhase::Idle {
            return Err(GateError::InvalidTransition(self.phase));
        }
        if message.trim().is_empty() {
            return Err(GateError::EmptyMessage);
        }
        self.phase = GatePhase::Disclosing;
        Ok(&DISCLOSED_CATEGORIES)
    }

    /// Record the sender's decision
    pub fn decide(&mut self, decision: ConsentDecision) -> Result<(), GateError> {
        if self.phase != GatePhase::Disclosing {
            return Err(GateError::InvalidTransition(self.phase));
        }
        self.phase = match decision {
            ConsentDecision::Precise => GatePhase::PreciseRequested,
            ConsentDecision::Approximate => GatePhase::ApproximateRequested,
            ConsentDecision::Cancelled => GatePhase::Cancelled,
        };
        Ok(())
    }

    /// Tear the gate down, yielding the orchestrator's input
    pub fn resolve(&mut self) -> Result<GateOutcome, GateError> {
        let outcome = match self.phase {
            GatePhase::PreciseRequested => GateOutcome::Proceed {
                attempt_precise: true,
            },
            GatePhase::ApproximateRequested => GateOutcome::Proceed {
                attempt_precise: false,
            },
            GatePhase::Cancelled => GateOutcome::Cancelled,
            phase => return Err(GateError::InvalidTransition(phase)),
        };
        self.phase = GatePhase::Resolved;
        Ok(outcome)
    }
}

impl Default for ConsentGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Device location sensor seam
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Location access denied")]
    Denied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DeviceLocationProvider: Send + Sync {
    /// Request one fix; `high_accuracy` asks the sensor for its best effort
    async fn locate(&self, high_accuracy: bool) -> Result<GeoCoords, LocateError>;
}

/// Request a device fix with the bounded wait. Timeout and denial both
/// degrade to `None`; the submission then relies on network resolution.
pub async fn acquire_device_location(provider: &dyn DeviceLocationProvider) -> Option<GeoCoords> {
    match tokio::time::timeout(LOCATE_TIMEOUT, provider.locate(true)).await {
        Ok(Ok(coords)) => Some(coords),
        Ok(Err(e)) => {
            debug!(error = %e, "Device location unavailable, using network resolution");
            None
        }
        Err(_) => {
            debug!("Device location timed out, using network resolution");
            None
        }
    }
}

/// Reads a fix from the `TXP_DEVICE_COORDS` environment variable
/// (`lat,lng,accuracy`). Stands in for a platform sensor on headless
/// installs; real sensors implement [`DeviceLocationProvider`] directly.
pub struct EnvLocationProvider;

#[async_trait]
impl DeviceLocationProvider for EnvLocationProvider {
    async fn locate(&self, _high_accuracy: bool) -> Result<GeoCoords, LocateError> {
        let raw = std::env::var("TXP_DEVICE_COORDS")
            .map_err(|_| LocateError::Unavailable("no sensor configured".to_string()))?;
        parse_coords(&raw).ok_or_else(|| {
            LocateError::Unavailable(format!("could not parse TXP_DEVICE_COORDS: {}", raw))
        })
    }
}

fn parse_coords(raw: &str) -> Option<GeoCoords> {
    let mut parts = raw.split(',').map(str::trim);
    let lat = parts.next()?.parse().ok()?;
    let lng = parts.next()?.parse().ok()?;
    let accuracy = parts.next().and_then(|a| a.parse().ok()).unwrap_or(0.0);
    Some(GeoCoords { lat, lng, accuracy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_precise_flow() {
        let mut gate = ConsentGate::new();
        let categories = gate.begin("hello").unwrap();
        assert_eq!(categories.len(), 4);
        assert_eq!(gate.phase(), GatePhase::Disclosing);

        gate.decide(ConsentDecision::Precise).unwrap();
        assert_eq!(gate.phase(), GatePhase::PreciseRequested);

        let outcome = gate.resolve().unwrap();
        assert_eq!(
            outcome,
            GateOutcome::Proceed {
                attempt_precise: true
            }
        );
        assert_eq!(gate.phase(), GatePhase::Resolved);
    }

    #[test]
    fn approximate_resolves_without_precise_flag() {
        let mut gate = ConsentGate::new();
        gate.begin("hello").unwrap();
        gate.decide(ConsentDecision::Approximate).unwrap();
        assert_eq!(
            gate.resolve().unwrap(),
            GateOutcome::Proceed {
                attempt_precise: false
            }
        );
    }

    #[test]
    fn cancel_aborts_submission() {
        let mut gate = ConsentGate::new();
        gate.begin("hello").unwrap();
        gate.decide(ConsentDecision::Cancelled).unwrap();
        assert_eq!(gate.resolve().unwrap(), GateOutcome::Cancelled);
    }

    #[test]
    fn empty_message_never_enters_disclosure() {
        let mut gate = ConsentGate::new();
        assert_eq!(gate.begin("   "), Err(GateError::EmptyMessage));
        assert_eq!(gate.phase(), GatePhase::Idle);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut gate = ConsentGate::new();
        assert!(matches!(
            gate.decide(ConsentDecision::Precise),
            Err(GateError::InvalidTransition(GatePhase::Idle))
        ));
        assert!(gate.resolve().is_err());

        gate.begin("hello").unwrap();
        assert!(gate.begin("hello").is_err());
    }

    struct NeverProvider;

    #[async_trait]
    impl DeviceLocationProvider for NeverProvider {
        async fn locate(&self, _high_accuracy: bool) -> Result<GeoCoords, LocateError> {
            std::future::pending().await
        }
    }

    struct DeniedProvider;

    #[async_trait]
    impl DeviceLocationProvider for DeniedProvider {
        async fn locate(&self, _high_accuracy: bool) -> Result<GeoCoords, LocateError> {
            Err(LocateError::Denied)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_timeout_degrades_to_none() {
        assert!(acquire_device_location(&NeverProvider).await.is_none());
    }

    #[tokio::test]
    async fn sensor_denial_degrades_to_none() {
        assert!(acquire_device_location(&DeniedProvider).await.is_none());
    }

    #[test]
    fn coords_parse_with_and_without_accuracy() {
        let coords = parse_coords("52.52, 13.405, 20").unwrap();
        assert_eq!(coords.lat, 52.52);
        assert_eq!(coords.accuracy, 20.0);

        let coords = parse_coords("52.52,13.405").unwrap();
        assert_eq!(coords.accuracy, 0.0);

        assert!(parse_coords("not-coords").is_none());
    }
}
