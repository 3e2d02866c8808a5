//! txp-cc - Transmission Portal Capture Console
//!
//! Interactive contact-submission client: typed message, optional voice
//! note (60-second ceiling), optional live selfie, explicit metadata
//! consent, then one transmission to the ingest gateway.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use txp_common::human_time::format_mmss;

use txp_cc::capture::camera::{self, CommandBackend};
use txp_cc::capture::{AudioArtifact, AudioRecorder, ImageArtifact, MAX_DURATION_SECONDS};
use txp_cc::consent::{ConsentDecision, ConsentGate, EnvLocationProvider, GateOutcome};
use txp_cc::error::CaptureError;
use txp_cc::orchestrator::{Orchestrator, SubmissionForm};
use txp_cc::{device, SubmitError};

const PLACEHOLDERS: [&str; 4] = [
    "Tell me something interesting... or just say hi.",
    "Your message here. Make it memorable.",
    "Go ahead, spill the tea.",
    "Type something profound... or just 'hi', that works too.",
];

const ENCOURAGEMENTS: [&str; 4] = [
    "Your voice is being captured by science...",
    "Recording... make it count!",
    "Speak now or forever hold your peace.",
    "The microphone is listening intently...",
];

const CAPTIONS: [&str; 4] = [
    "This face will accompany your message.",
    "The face behind the message. Very mysterious.",
    "Looking good! (I assume, I'm just code.)",
    "Captured live, straight from the lens.",
];

#[derive(Parser, Debug)]
#[command(name = "txp-cc", version, about = "Transmission Portal capture console")]
struct Args {
    /// Ingest gateway base URL
    #[arg(long, env = "TXP_GATEWAY_URL", default_value = "http://127.0.0.1:5761")]
    gateway_url: String,

    /// Message text (prompted interactively when omitted)
    #[arg(long)]
    message: Option<String>,

    /// Record a voice note before submitting
    #[arg(long)]
    voice_note: bool,

    /// Take a live selfie before submitting
    #[arg(long)]
    selfie: bool,

    /// Optional contact email (unverified)
    #[arg(long)]
    contact_email: Option<String>,

    /// Optional social handle (unverified)
    #[arg(long)]
    contact_social: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let message = match args.message {
        Some(message) if !message.trim().is_empty() => message,
        _ => prompt_message(&mut lines).await?,
    };
    // Deterministic flavor: keyed off the message, not a random source
    let pick = message.len();

    let audio = if args.voice_note {
        record_voice_note(&mut lines, pick).await?
    } else {
        None
    };

    let image = if args.selfie {
        take_selfie(pick).await
    } else {
        None
    };

    let form = SubmissionForm {
        message,
        audio,
        image,
        contact_email: args.contact_email,
        contact_social: args.contact_social,
    };

    // Consent gate: the only user-cancellable point
    let mut gate = ConsentGate::new();
    let categories = gate.begin(&form.message)?;
    println!("\nThis transmission logs some contextual data with your message:");
    for category in categories {
        println!("  - {}", category);
    }
    println!("\nLocation mode: [p]recise (device sensor) / [a]pproximate (network) / [c]ancel");
    let decision = loop {
        print_inline("> ");
        match lines.next_line().await?.unwrap_or_default().trim() {
            "p" | "P" => break ConsentDecision::Precise,
            "a" | "A" => break ConsentDecision::Approximate,
            "c" | "C" => break ConsentDecision::Cancelled,
            _ => println!("Please answer p, a, or c."),
        }
    };
    gate.decide(decision)?;
    let outcome = gate.resolve()?;

    if outcome == GateOutcome::Cancelled {
        println!("Cancelled. Nothing was sent.");
        return Ok(());
    }

    let orchestrator = Orchestrator::new(args.gateway_url)?;
    loop {
        match orchestrator
            .submit(&form, outcome, device::snapshot(), &EnvLocationProvider)
            .await
        {
            Ok(ack) => {
                println!("\nMessage transmitted!");
                println!("  id: {}", ack.id);
                match (&ack.location.city, &ack.location.country) {
                    (Some(city), Some(country)) => {
                        println!("  seen from: {}, {} ({})", city, country, ack.location.source)
                    }
                    (None, Some(country)) => {
                        println!("  seen from: {} ({})", country, ack.location.source)
                    }
                    _ => println!("  location: unresolved"),
                }
                return Ok(());
            }
            Err(SubmitError::Cancelled) => {
                println!("Cancelled. Nothing was sent.");
                return Ok(());
            }
            Err(e) => {
                // The form is untouched; offer a retry with no data loss
                println!("\n{}", e);
                print_inline("Retry? [y/N] ");
                match lines.next_line().await?.unwrap_or_default().trim() {
                    "y" | "Y" => continue,
                    _ => {
                        println!("Your message was kept locally. Try again later.");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn prompt_message(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    loop {
        // Placeholder choice varies with the seconds counter, not an RNG
        let hint = PLACEHOLDERS[chrono::Utc::now().timestamp() as usize % PLACEHOLDERS.len()];
        println!("Your message ({})", hint);
        print_inline("> ");
        let line = lines.next_line().await?.unwrap_or_default();
        if !line.trim().is_empty() {
            return Ok(line);
        }
        println!("A message is required.");
    }
}

/// Voice note flow: start on demand, show live elapsed/limit, stop on
/// Enter or automatically at the ceiling, then keep / re-record / discard.
async fn record_voice_note(
    lines: &mut Lines<BufReader<Stdin>>,
    pick: usize,
) -> Result<Option<AudioArtifact>> {
    let mut recorder = AudioRecorder::new();
    loop {
        println!(
            "\nVoice note (max {}). Press Enter to stop.",
            format_mmss(MAX_DURATION_SECONDS as i64)
        );
        if let Err(e) = recorder.start() {
            match e {
                CaptureError::PermissionDenied(reason) => {
                    // Disabled-feature state, not a hard error
                    println!("Voice note unavailable: {}", reason);
                    return Ok(None);
                }
                other => return Err(other.into()),
            }
        }
        println!("{}", ENCOURAGEMENTS[pick % ENCOURAGEMENTS.len()]);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let _ = line?;
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(250)) => {
                    print_inline(&format!(
                        "\r  {} / {}",
                        format_mmss(recorder.elapsed_seconds() as i64),
                        format_mmss(MAX_DURATION_SECONDS as i64)
                    ));
                    // Hard cap: finalized without user action
                    if recorder.cap_reached() {
                        println!("\nReached the ceiling, finalizing.");
                        break;
                    }
                }
            }
        }

        let duration = match recorder.stop() {
            Ok(artifact) => artifact.duration_seconds,
            Err(e) => {
                println!("Recording failed: {}", e);
                recorder.clear();
                return Ok(None);
            }
        };
        println!("\nRecorded {}.", format_mmss(duration as i64));

        print_inline("Keep it? [K]eep / [r]e-record / [d]iscard ");
        match lines.next_line().await?.unwrap_or_default().trim() {
            "r" | "R" => {
                // Re-recording requires an explicit clear first
                recorder.clear();
                continue;
            }
            "d" | "D" => {
                recorder.clear();
                return Ok(None);
            }
            _ => return Ok(recorder.take_artifact()),
        }
    }
}

/// Selfie flow: open the camera backend, count down, run the capture
/// fallback chain.
async fn take_selfie(pick: usize) -> Option<ImageArtifact> {
    let toml_config = txp_common::config::load_toml_config().unwrap_or_default();
    let mut backend = CommandBackend::new(
        toml_config.camera_still_command,
        toml_config.camera_frame_command,
    );

    if let Err(e) = backend.open() {
        println!("\nSelfie unavailable: {}", e);
        return None;
    }

    println!("\nSelfie in...");
    camera::run_countdown(|remaining| {
        println!("  {}...", remaining);
    })
    .await;

    match camera::capture(&mut backend) {
        Ok(artifact) => {
            println!("Captured! {}", CAPTIONS[pick % CAPTIONS.len()]);
            Some(artifact)
        }
        Err(e) => {
            println!("{}", e);
            None
        }
    }
}

fn print_inline(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}
