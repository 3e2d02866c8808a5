//! Voice note recording
//!
//! Records from the platform's default audio input via cpal. The device is
//! acquired lazily on `start()` and released the moment the input stream is
//! dropped in `stop()`; no lingering device lock. The 60-second ceiling is
//! enforced inside [`SampleSink`] against the stream's sample budget, so the
//! sink stops accepting samples at exactly the cap regardless of callback
//! timing; the owning loop observes `cap_reached()` and finalizes.
//!
//! Recording may be restarted only after `clear()`; there is no
//! overwrite-in-place.

use crate::error::CaptureError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Hard ceiling on a voice note, in seconds
pub const MAX_DURATION_SECONDS: u32 = 60;

/// Accumulates interleaved i16 samples up to the hard cap.
///
/// Shared between the cpal input callback and the recorder; once the sample
/// budget is reached the sink marks itself complete and silently drops
/// everything further.
#[derive(Debug)]
pub struct SampleSink {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    max_samples: usize,
    complete: bool,
}

impl SampleSink {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let max_samples = sample_rate as usize * channels as usize * MAX_DURATION_SECONDS as usize;
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
            max_samples,
            complete: false,
        }
    }

    /// Append a chunk of interleaved samples, honoring the cap exactly.
    pub fn push(&mut self, chunk: &[i16]) {
        if self.complete {
            return;
        }
        let room = self.max_samples - self.samples.len();
        let take = room.min(chunk.len());
        self.samples.extend_from_slice(&chunk[..take]);
        if self.samples.len() >= self.max_samples {
            self.complete = true;
        }
    }

    /// Elapsed recorded time in whole seconds
    pub fn elapsed_seconds(&self) -> u32 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        (frames as u64 / self.sample_rate.max(1) as u64) as u32
    }

    /// True once the sample budget is exhausted
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }
}

/// Finalized voice note: WAV bytes plus the recorded duration
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub wav_bytes: Vec<u8>,
    pub duration_seconds: u32,
}

/// Encode accumulated samples as a 16-bit PCM WAV blob
pub fn encode_wav(sink: &SampleSink) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels: sink.channels(),
        sample_rate: sink.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        for &sample in sink.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

enum RecorderState {
    Idle,
    Recording,
    Finalized,
}

/// Single-flow voice note recorder.
///
/// One recording at a time; a second `start()` while recording or before
/// `clear()` is a no-op so the caller can simply disable its button.
pub struct AudioRecorder {
    state: RecorderState,
    sink: Option<Arc<Mutex<SampleSink>>>,
    stream: Option<Stream>,
    artifact: Option<AudioArtifact>,
}

impl AudioRecorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            sink: None,
            stream: None,
            artifact: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording)
    }

    pub fn has_recording(&self) -> bool {
        self.artifact.is_some()
    }

    /// Acquire the default input device and begin recording.
    ///
    /// No-op when already recording or when an artifact awaits `clear()`.
    /// Device acquisition failure maps to `PermissionDenied` and leaves the
    /// recorder usable (feature disabled, form intact).
    pub fn start(&mut self) -> Result<(), CaptureError> {
        match self.state {
            RecorderState::Recording | RecorderState::Finalized => return Ok(()),
            RecorderState::Idle => {}
        }

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::PermissionDenied("No audio input device available".to_string())
        })?;
        let config = device.default_input_config().map_err(|e| {
            CaptureError::PermissionDenied(format!("Audio input access refused: {}", e))
        })?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        let sink = Arc::new(Mutex::new(SampleSink::new(sample_rate, channels)));

        let stream = build_input_stream(&device, &config, Arc::clone(&sink))?;
        stream.play().map_err(|e| {
            CaptureError::PermissionDenied(format!("Audio input stream failed: {}", e))
        })?;

        info!(sample_rate, channels, "Recording started");
        self.sink = Some(sink);
        self.stream = Some(stream);
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Elapsed recorded seconds (0 when not recording)
    pub fn elapsed_seconds(&self) -> u32 {
        self.sink
            .as_ref()
            .map(|s| s.lock().map(|s| s.elapsed_seconds()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// True once the 60-second sample budget is exhausted
    pub fn cap_reached(&self) -> bool {
        self.sink
            .as_ref()
            .map(|s| s.lock().map(|s| s.is_complete()).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Stop recording, release the device immediately, finalize the artifact.
    pub fn stop(&mut self) -> Result<&AudioArtifact, CaptureError> {
        if !matches!(self.state, RecorderState::Recording) {
            return Err(CaptureError::InvalidState(
                "Not currently recording".to_string(),
            ));
        }

        // Dropping the stream releases the device handle
        self.stream = None;

        let sink = self
            .sink
            .take()
            .ok_or_else(|| CaptureError::InvalidState("Recorder lost its sink".to_string()))?;
        let sink = sink
            .lock()
            .map_err(|_| CaptureError::Encoding("Recorder sink poisoned".to_string()))?;

        let duration_seconds = sink.elapsed_seconds().min(MAX_DURATION_SECONDS);
        let wav_bytes = encode_wav(&sink)?;

        info!(duration_seconds, bytes = wav_bytes.len(), "Recording finalized");
        self.artifact = Some(AudioArtifact {
            wav_bytes,
            duration_seconds,
        });
        self.state = RecorderState::Finalized;
        Ok(self.artifact.as_ref().unwrap())
    }

    /// Discard any artifact and return to the pre-recording state.
    pub fn clear(&mut self) {
        if self.stream.is_some() {
            debug!("Clearing an active recording; releasing device");
        }
        self.stream = None;
        self.sink = None;
        self.artifact = None;
        self.state = RecorderState::Idle;
    }

    /// Take ownership of the finalized artifact, if any
    pub fn take_artifact(&mut self) -> Option<AudioArtifact> {
        self.artifact.take()
    }
}

impl Default for AudioRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_input_stream(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    sink: Arc<Mutex<SampleSink>>,
) -> Result<Stream, CaptureError> {
    let stream_config: cpal::StreamConfig = config.config();
    let err_fn = |e| warn!("Audio input stream error: {}", e);

    let stream = match config.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                if let Ok(mut sink) = sink.lock() {
                    sink.push(data);
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                let converted: Vec<i16> =
                    data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                if let Ok(mut sink) = sink.lock() {
                    sink.push(&converted);
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                if let Ok(mut sink) = sink.lock() {
                    sink.push(&converted);
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::PermissionDenied(format!(
                "Unsupported input sample format: {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| CaptureError::PermissionDenied(format!("Audio input access refused: {}", e)))
}
