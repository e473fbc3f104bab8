//! Terminal front-end for the tutor voice session.
//!
//! Push-to-talk loop: Enter triggers one capture cycle, then the transcript
//! tail and the mascot face are redrawn. Degrades per capability: without a
//! microphone or STT key it falls back to typed input, without an output
//! device or TTS key replies are shown but not spoken.

use std::io::BufRead;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_voice::{
    AudioSpeaker, CycleOutcome, Emotion, HttpStt, HttpTts, MicCapture, NullSpeaker, Role,
    SessionConfig, SpeechCapture, SpeechOutput, VoiceResult, VoiceSession,
};

/// Capture fallback when no microphone/STT is available: one typed line per
/// "capture", empty line counts as no utterance.
struct TypedCapture;

#[async_trait::async_trait]
impl SpeechCapture for TypedCapture {
    async fn capture_utterance(&self) -> VoiceResult<String> {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(|e| tutor_voice::VoiceError::Capture(e.to_string()))??;
        Ok(line.trim().to_string())
    }
}

fn face(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Neutral => "( •‿• )",
        Emotion::Happy => "( ^‿^ )",
        Emotion::Thinking => "( •_• )?",
        Emotion::Explaining => "( o_o )/",
        Emotion::Confused => "( @_@ )",
        Emotion::Sad => "( ;_; )",
    }
}

/// Wait for Enter on the blocking pool; `None` on EOF.
async fn wait_for_enter() -> Option<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(()),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[tutor-console] .env not loaded: {e} (using system environment)");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env()?;
    tracing::info!(backend = %config.backend_url, "tutor console starting");

    // blocking HTTP clients must not be built on the async runtime threads
    let (stt, tts) = tokio::task::spawn_blocking(|| (HttpStt::from_env(), HttpTts::from_env()))
        .await?;

    let (capture, push_to_talk): (Arc<dyn SpeechCapture>, bool) = match stt
        .and_then(|stt| MicCapture::new(config.capture.clone(), Arc::new(stt)))
    {
        Ok(mic) => {
            tracing::info!("microphone capture ready");
            (Arc::new(mic), true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "speech capture unavailable; falling back to typed input");
            (Arc::new(TypedCapture), false)
        }
    };

    let speaker: Arc<dyn SpeechOutput> = match tts.and_then(|tts| AudioSpeaker::new(Arc::new(tts)))
    {
        Ok(speaker) => {
            tracing::info!("speech output ready");
            Arc::new(speaker)
        }
        Err(e) => {
            tracing::warn!(error = %e, "speech output unavailable; replies will be silent");
            Arc::new(NullSpeaker)
        }
    };

    let session = VoiceSession::new(&config, capture, Arc::clone(&speaker))?;

    println!("\n  {}  Conversational AI Tutor", face(session.affect().await));
    if push_to_talk {
        println!("  Press Enter to talk, Ctrl-D to quit.\n");
    } else {
        println!("  Press Enter, then type your question (empty line cancels). Ctrl-D quits.\n");
    }

    loop {
        if wait_for_enter().await.is_none() {
            break;
        }
        if push_to_talk {
            println!("  listening...");
        }

        match session.trigger().await {
            Ok(CycleOutcome::NoUtterance) => {
                println!("  (didn't catch that)\n");
                continue;
            }
            Ok(CycleOutcome::Busy) => continue,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "cycle failed");
                continue;
            }
        }

        let transcript = session.transcript().await;
        for message in transcript.iter().rev().take(2).rev() {
            let who = match message.role {
                Role::User => "You",
                Role::Assistant => "Tutor",
            };
            println!("  {who}: {}", message.text);
        }
        println!("  {}\n", face(session.affect().await));
    }

    // silence anything still mid-utterance before exiting
    speaker.cancel();
    println!("bye!");
    Ok(())
}
