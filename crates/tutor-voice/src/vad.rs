//! Voice activity detection over 30ms PCM frames (WebRTC VAD).
//!
//! The detector decides per frame whether the microphone is hearing speech;
//! utterance boundaries (gap logic) live in [`crate::capture`].

use crate::error::{VoiceError, VoiceResult};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Per-frame speech detector. Not `Send`; create it on the thread that owns
/// the capture stream.
pub struct SpeechDetector {
    vad: Vad,
    frame_size: usize,
}

impl SpeechDetector {
    /// `sample_rate` must be one WebRTC VAD supports (8/16/32/48 kHz).
    pub fn new(sample_rate: u32) -> VoiceResult<Self> {
        let rate = match sample_rate {
            8000 => SampleRate::Rate8kHz,
            16000 => SampleRate::Rate16kHz,
            32000 => SampleRate::Rate32kHz,
            48000 => SampleRate::Rate48kHz,
            other => {
                return Err(VoiceError::Config(format!(
                    "VAD supports 8000/16000/32000/48000 Hz, got {other}"
                )))
            }
        };

        let mut vad = Vad::new();
        vad.set_mode(VadMode::Aggressive);
        vad.set_sample_rate(rate);

        // 30ms frames, the largest window WebRTC VAD accepts
        let frame_size = sample_rate as usize * 30 / 1000;

        Ok(Self { vad, frame_size })
    }

    /// Expected samples per frame (30ms worth).
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Whether one 30ms frame contains speech. The frame length must equal
    /// [`frame_size`](Self::frame_size).
    pub fn is_speech(&mut self, frame: &[f32]) -> VoiceResult<bool> {
        if frame.len() != self.frame_size {
            return Err(VoiceError::Capture(format!(
                "expected {} samples per VAD frame, got {}",
                self.frame_size,
                frame.len()
            )));
        }

        let pcm: Vec<i16> = frame
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();

        self.vad
            .is_voice_segment(&pcm)
            .map_err(|e| VoiceError::Capture(format!("VAD rejected frame: {e:?}")))
    }
}
