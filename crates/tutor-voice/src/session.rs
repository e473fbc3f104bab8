//! The voice interaction controller: sequences capture, the dialogue
//! exchange, speech output, and affect rendering into one session.
//!
//! State machine: `Idle → Listening → Awaiting → Speaking → Idle`. Every
//! failure path also resolves to `Idle`; the session is reusable
//! indefinitely. Triggers arriving while a cycle is in flight are rejected
//! no-ops with zero side effects.

use crate::affect::{AffectRenderer, Emotion};
use crate::capture::SpeechCapture;
use crate::config::SessionConfig;
use crate::dialogue::DialogueClient;
use crate::error::{VoiceError, VoiceResult};
use crate::speech::SpeechOutput;
use crate::transcript::{ConversationLog, Message};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Where the session currently is in the interaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Awaiting,
    Speaking,
}

/// How one trigger resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A cycle was already in flight; the trigger had no effect.
    Busy,
    /// Capture ended without a usable utterance; nothing was logged.
    NoUtterance,
    /// The backend exchange failed; a visible error entry was appended.
    BackendFailed,
    /// Full cycle: reply logged, affect applied, speech finished (or
    /// silently skipped when output is unavailable).
    Completed,
}

/// One voice session. Construct once per page/run and share by `Arc`; the
/// display layer reads [`transcript`](Self::transcript) and
/// [`affect`](Self::affect) and sends exactly one control signal,
/// [`trigger`](Self::trigger).
pub struct VoiceSession {
    capture: Arc<dyn SpeechCapture>,
    dialogue: DialogueClient,
    speaker: Arc<dyn SpeechOutput>,
    state: RwLock<SessionState>,
    transcript: RwLock<ConversationLog>,
    affect: RwLock<AffectRenderer>,
}

impl VoiceSession {
    pub fn new(
        config: &SessionConfig,
        capture: Arc<dyn SpeechCapture>,
        speaker: Arc<dyn SpeechOutput>,
    ) -> VoiceResult<Self> {
        let dialogue = DialogueClient::new(config.backend_url.clone(), config.request_timeout)?;
        Ok(Self {
            capture,
            dialogue,
            speaker,
            state: RwLock::new(SessionState::Idle),
            transcript: RwLock::new(ConversationLog::new()),
            affect: RwLock::new(AffectRenderer::new()),
        })
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Ordered snapshot of the conversation for the display layer.
    pub async fn transcript(&self) -> Vec<Message> {
        self.transcript.read().await.snapshot()
    }

    /// Current mascot presentation state.
    pub async fn affect(&self) -> Emotion {
        self.affect.read().await.current()
    }

    /// The single inbound control signal: run one capture cycle. Rejected as
    /// `Busy` unless the session is idle.
    pub async fn trigger(&self) -> VoiceResult<CycleOutcome> {
        {
            let mut state = self.state.write().await;
            if *state != SessionState::Idle {
                debug!(state = ?*state, "trigger ignored: cycle in flight");
                return Ok(CycleOutcome::Busy);
            }
            *state = SessionState::Listening;
        }

        let outcome = self.run_cycle().await;
        *self.state.write().await = SessionState::Idle;
        outcome
    }

    async fn run_cycle(&self) -> VoiceResult<CycleOutcome> {
        // Listening: the capture adapter holds the mic until it returns.
        let utterance = match self.capture.capture_utterance().await {
            Ok(text) => text,
            Err(e) if e.is_capture_miss() => {
                debug!(error = %e, "capture ended without a result");
                return Ok(CycleOutcome::NoUtterance);
            }
            Err(e) => return Err(e),
        };
        let utterance = utterance.trim().to_string();
        if utterance.is_empty() {
            debug!("capture produced empty text");
            return Ok(CycleOutcome::NoUtterance);
        }

        info!(utterance = %utterance, "utterance recognized");
        self.transcript
            .write()
            .await
            .append(Message::user(utterance.clone()));
        self.set_state(SessionState::Awaiting).await;

        let reply = match self.dialogue.send(&utterance).await {
            Ok(reply) => reply,
            Err(e @ (VoiceError::Network(_) | VoiceError::Decode(_))) => {
                warn!(error = %e, "dialogue exchange failed");
                // visible entry so the user sees the utterance was not
                // silently dropped; no emotion, no speech for this path
                self.transcript.write().await.append(Message::assistant(
                    format!("(no reply from the tutor: {e})"),
                    None,
                ));
                return Ok(CycleOutcome::BackendFailed);
            }
            Err(e) => return Err(e),
        };

        info!(text = %reply.text, emotion = ?reply.emotion, "reply received");
        self.transcript
            .write()
            .await
            .append(Message::assistant(reply.text.clone(), reply.emotion.clone()));
        self.set_state(SessionState::Speaking).await;

        if let Err(e) = self.speaker.speak(&reply.text).await {
            // speech output is an enhancement; a reply that cannot be voiced
            // is still visible in the transcript
            warn!(error = %e, "speech output failed");
        }
        let emotion = self.affect.write().await.apply(reply.emotion.as_deref());
        debug!(face = emotion.presentation(), "affect applied");

        self.speaker.wait_until_done().await;
        Ok(CycleOutcome::Completed)
    }

    async fn set_state(&self, next: SessionState) {
        *self.state.write().await = next;
    }
}
