//! Error types for the voice interaction pipeline.

use thiserror::Error;

/// Result type alias for voice session operations.
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Failure taxonomy for the voice session.
///
/// Capability variants are raised at adapter construction so callers can
/// degrade before any capture is attempted. Every other variant resolves
/// back to an idle session; none are fatal.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// No speech-capture capability (e.g. no input device on the host).
    #[error("speech capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// No speech-output capability (e.g. no output device on the host).
    #[error("speech output unavailable: {0}")]
    PlaybackUnavailable(String),

    /// A capture attempt ended without a usable utterance.
    #[error("capture failed: {0}")]
    Capture(String),

    /// Speech-to-text backend error.
    #[error("STT error: {0}")]
    Stt(String),

    /// Empty utterance rejected before any network call.
    #[error("empty utterance")]
    EmptyUtterance,

    /// Dialogue backend unreachable, timed out, or returned a non-success status.
    #[error("dialogue backend error: {0}")]
    Network(String),

    /// Dialogue backend response did not match the expected reply shape.
    #[error("dialogue reply decode error: {0}")]
    Decode(String),

    /// Text-to-speech backend error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio playback error.
    #[error("playback error: {0}")]
    Playback(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel send error.
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Whether the controller should treat this as a silent capture miss:
    /// return to idle with no transcript entry.
    pub fn is_capture_miss(&self) -> bool {
        matches!(
            self,
            VoiceError::Capture(_) | VoiceError::Stt(_) | VoiceError::EmptyUtterance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_misses_are_silent() {
        assert!(VoiceError::Capture("no speech".into()).is_capture_miss());
        assert!(VoiceError::Stt("engine gone".into()).is_capture_miss());
        assert!(VoiceError::EmptyUtterance.is_capture_miss());
        assert!(!VoiceError::Network("timeout".into()).is_capture_miss());
        assert!(!VoiceError::Decode("missing text".into()).is_capture_miss());
    }
}
