//! Submission orchestrator
//!
//! Assembles the outbound payload from the finalized form, the consent
//! gate's outcome, and a device/locale snapshot, then transmits it in one
//! request. Every step before transmission is failure-tolerant: a device
//! fix may resolve to nothing and artifact encoding failures null the
//! affected field. The form itself is only borrowed, so a failed
//! transmission loses no data; the caller re-submits the same form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use tracing::{info, warn};
use txp_common::api::types::{SubmissionAck, SubmissionRequest};

use crate::capture::{AudioArtifact, ImageArtifact};
use crate::consent::{self, DeviceLocationProvider, GateOutcome};
use crate::device::DeviceSnapshot;
use crate::error::SubmitError;

const USER_AGENT: &str = concat!("txp-cc/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The finalized form contents handed to the orchestrator
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub message: String,
    pub audio: Option<AudioArtifact>,
    pub image: Option<ImageArtifact>,
    pub contact_email: Option<String>,
    pub contact_social: Option<String>,
}

/// Transmits submissions to the ingest gateway
pub struct Orchestrator {
    http_client: reqwest::Client,
    gateway_url: String,
}

impl Orchestrator {
    pub fn new(gateway_url: String) -> Result<Self, SubmitError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run the submission flow: optional device fix, payload assembly, one
    /// POST. A `Cancelled` gate outcome aborts before any network activity.
    pub async fn submit(
        &self,
        form: &SubmissionForm,
        outcome: GateOutcome,
        snapshot: DeviceSnapshot,
        location_provider: &dyn DeviceLocationProvider,
    ) -> Result<SubmissionAck, SubmitError> {
        let attempt_precise = match outcome {
            GateOutcome::Cancelled => return Err(SubmitError::Cancelled),
            GateOutcome::Proceed { attempt_precise } => attempt_precise,
        };

        // Best-effort device fix; may resolve to none
        let coords = if attempt_precise {
            consent::acquire_device_location(location_provider).await
        } else {
            None
        };

        let request = build_request(form, attempt_precise, coords, snapshot);
        self.transmit(&request).await
    }

    async fn transmit(&self, request: &SubmissionRequest) -> Result<SubmissionAck, SubmitError> {
        let url = format!("{}/contact", self.gateway_url);
        info!(
            has_audio = request.audio_data.is_some(),
            has_image = request.image_data.is_some(),
            precise = request.location_precise,
            "Transmitting submission"
        );

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let ack: SubmissionAck = response
                .json()
                .await
                .map_err(|e| SubmitError::Network(format!("Malformed acknowledgement: {}", e)))?;
            info!(submission_id = %ack.id, "Submission acknowledged");
            return Ok(ack);
        }

        // The gateway's error bodies are display-ready; anything else gets
        // a generic retry message.
        let message = response
            .json::<txp_common::api::types::ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| "Submission failed, please try again".to_string());
        Err(SubmitError::Rejected(message))
    }
}

/// Assemble the wire payload. Artifact encoding failures null the affected
/// field rather than aborting the submission.
pub fn build_request(
    form: &SubmissionForm,
    attempt_precise: bool,
    coords: Option<txp_common::api::types::GeoCoords>,
    snapshot: DeviceSnapshot,
) -> SubmissionRequest {
    let (audio_data, audio_duration) = match &form.audio {
        Some(artifact) => match encode_audio(artifact) {
            Some(encoded) => (Some(encoded), Some(artifact.duration_seconds as i64)),
            None => (None, None),
        },
        None => (None, None),
    };

    SubmissionRequest {
        message: form.message.clone(),
        audio_data,
        audio_duration,
        image_data: form.image.as_ref().map(|i| i.data_url.clone()),
        contact_email: form.contact_email.clone(),
        contact_social: form.contact_social.clone(),
        location_precise: attempt_precise,
        location_coords: coords,
        device_info: snapshot.device_info,
        timezone: snapshot.timezone,
        timezone_offset: snapshot.timezone_offset,
        languages: snapshot.languages,
    }
}

fn encode_audio(artifact: &AudioArtifact) -> Option<String> {
    if artifact.wav_bytes.is_empty() {
        warn!("Empty audio artifact, transmitting without voice note");
        return None;
    }
    Some(format!(
        "data:audio/wav;base64,{}",
        BASE64.encode(&artifact.wav_bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device;
    use axum::routing::post;
    use axum::{Json, Router};
    use txp_common::api::types::GeoCoords;

    fn form_with_media() -> SubmissionForm {
        SubmissionForm {
            message: "hello".to_string(),
            audio: Some(AudioArtifact {
                wav_bytes: vec![1, 2, 3, 4],
                duration_seconds: 12,
            }),
            image: Some(ImageArtifact {
                data_url: "data:image/jpeg;base64,QUJD".to_string(),
            }),
            contact_email: Some("a@b.c".to_string()),
            contact_social: None,
        }
    }

    #[test]
    fn build_request_maps_all_fields() {
        let request = build_request(
            &form_with_media(),
            true,
            Some(GeoCoords {
                lat: 52.52,
                lng: 13.405,
                accuracy: 20.0,
            }),
            device::snapshot(),
        );

        assert_eq!(request.message, "hello");
        assert!(request
            .audio_data
            .as_deref()
            .unwrap()
            .starts_with("data:audio/wav;base64,"));
        assert_eq!(request.audio_duration, Some(12));
        assert_eq!(
            request.image_data.as_deref(),
            Some("data:image/jpeg;base64,QUJD")
        );
        assert!(request.location_precise);
        assert_eq!(request.location_coords.map(|c| c.lat), Some(52.52));
    }

    #[test]
    fn empty_audio_artifact_nulls_both_audio_fields() {
        let mut form = form_with_media();
        form.audio = Some(AudioArtifact {
            wav_bytes: Vec::new(),
            duration_seconds: 12,
        });

        let request = build_request(&form, false, None, device::snapshot());
        assert!(request.audio_data.is_none());
        assert!(request.audio_duration.is_none());
    }

    #[tokio::test]
    async fn cancelled_outcome_never_touches_the_network() {
        // A gateway URL that would fail loudly if contacted
        let orchestrator = Orchestrator::new("http://127.0.0.1:1".to_string()).unwrap();
        let result = orchestrator
            .submit(
                &form_with_media(),
                GateOutcome::Cancelled,
                device::snapshot(),
                &crate::consent::EnvLocationProvider,
            )
            .await;
        assert!(matches!(result, Err(SubmitError::Cancelled)));
    }

    #[tokio::test]
    async fn network_failure_is_typed_and_form_survives() {
        let orchestrator = Orchestrator::new("http://127.0.0.1:1".to_string()).unwrap();
        let form = form_with_media();
        let result = orchestrator
            .submit(
                &form,
                GateOutcome::Proceed {
                    attempt_precise: false,
                },
                device::snapshot(),
                &crate::consent::EnvLocationProvider,
            )
            .await;
        assert!(matches!(result, Err(SubmitError::Network(_))));
        // The borrowed form still holds everything for a retry
        assert_eq!(form.message, "hello");
        assert!(form.audio.is_some());
    }

    async fn spawn_gateway_stub(response: serde_json::Value, status: u16) -> String {
        let app = Router::new().route(
            "/contact",
            post(move || {
                let response = response.clone();
                async move {
                    (
                        axum::http::StatusCode::from_u16(status).unwrap(),
                        Json(response),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn successful_transmission_parses_acknowledgement() {
        let url = spawn_gateway_stub(
            serde_json::json!({
                "success": true,
                "id": "abc-123",
                "location": {"city": "Berlin", "country": "Germany", "source": "ip"}
            }),
            200,
        )
        .await;

        let orchestrator = Orchestrator::new(url).unwrap();
        let ack = orchestrator
            .submit(
                &form_with_media(),
                GateOutcome::Proceed {
                    attempt_precise: false,
                },
                device::snapshot(),
                &crate::consent::EnvLocationProvider,
            )
            .await
            .unwrap();
        assert_eq!(ack.id, "abc-123");
        assert_eq!(ack.location.source, "ip");
    }

    #[tokio::test]
    async fn gateway_rejection_surfaces_display_message() {
        let url = spawn_gateway_stub(
            serde_json::json!({"success": false, "error": "Message is required"}),
            400,
        )
        .await;

        let orchestrator = Orchestrator::new(url).unwrap();
        let result = orchestrator
            .submit(
                &form_with_media(),
                GateOutcome::Proceed {
                    attempt_precise: false,
                },
                device::snapshot(),
                &crate::consent::EnvLocationProvider,
            )
            .await;
        match result {
            Err(SubmitError::Rejected(message)) => assert_eq!(message, "Message is required"),
            other => panic!("expected rejection, got {:?}", other.map(|a| a.id)),
        }
    }
}
