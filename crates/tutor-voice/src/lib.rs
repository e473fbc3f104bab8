//! # tutor-voice — voice interaction controller for the conversational tutor
//!
//! Sequences speech capture, the dialogue backend exchange, speech output,
//! and affect rendering into one cancellable session:
//!
//! ```text
//! trigger → MicCapture (cpal + VAD + STT)  → transcript (user message)
//!         → DialogueClient  POST /chat     → transcript (assistant message)
//!         → AudioSpeaker (TTS + rodio, cancel-on-new-speak)
//!         → AffectRenderer (emotion tag → mascot face)
//! ```
//!
//! The display layer reads [`VoiceSession::transcript`] and
//! [`VoiceSession::affect`] and sends exactly one control signal,
//! [`VoiceSession::trigger`]. Capture and output adapters are trait seams:
//! swap in [`ScriptedCapture`] / [`NullSpeaker`] when the hardware or a
//! provider key is missing.

pub mod affect;
pub mod capture;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod session;
pub mod speech;
pub mod stt;
pub mod transcript;
pub mod tts;
pub mod vad;

pub use affect::{AffectRenderer, Emotion};
pub use capture::{CaptureConfig, MicCapture, ScriptedCapture, SpeechCapture};
pub use config::SessionConfig;
pub use dialogue::{DialogueClient, DialogueReply};
pub use error::{VoiceError, VoiceResult};
pub use session::{CycleOutcome, SessionState, VoiceSession};
pub use speech::{AudioSpeaker, NullSpeaker, SpeechOutput};
pub use stt::{HttpStt, PcmTurn, PlaceholderStt, SttBackend};
pub use transcript::{ConversationLog, Message, Role};
pub use tts::{HttpTts, PlaceholderTts, TtsBackend};
pub use vad::SpeechDetector;
