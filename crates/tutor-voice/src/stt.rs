//! Speech-to-text backends: turn one captured PCM utterance into text.
//!
//! `HttpStt` talks to an OpenAI-compatible transcription endpoint with a
//! blocking client; call it from a dedicated or blocking-capable thread
//! (`MicCapture` wraps it in `spawn_blocking`).

use crate::error::{VoiceError, VoiceResult};
use std::io::Write;
use std::time::Duration;

/// One committed span of recognized speech, buffered as PCM.
#[derive(Debug, Clone)]
pub struct PcmTurn {
    /// Mono samples, -1.0..1.0.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Approximate speech duration.
    pub duration: Duration,
}

/// Converts one PCM turn to text.
pub trait SttBackend: Send + Sync {
    /// Transcribe one turn; return an empty string when nothing was recognized.
    fn transcribe(&self, turn: &PcmTurn) -> VoiceResult<String>;
}

/// Encode mono f32 PCM as 16-bit WAV bytes for API upload.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    // header writes into a Vec cannot fail
    let _ = wav.write_all(b"RIFF");
    let _ = wav.write_all(&(36 + data_len).to_le_bytes());
    let _ = wav.write_all(b"WAVE");
    let _ = wav.write_all(b"fmt ");
    let _ = wav.write_all(&16u32.to_le_bytes());
    let _ = wav.write_all(&1u16.to_le_bytes()); // PCM
    let _ = wav.write_all(&1u16.to_le_bytes()); // mono
    let _ = wav.write_all(&sample_rate.to_le_bytes());
    let _ = wav.write_all(&(sample_rate * 2).to_le_bytes()); // byte rate
    let _ = wav.write_all(&2u16.to_le_bytes()); // block align
    let _ = wav.write_all(&16u16.to_le_bytes()); // bits per sample
    let _ = wav.write_all(b"data");
    let _ = wav.write_all(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        let _ = wav.write_all(&i.to_le_bytes());
    }
    wav
}

/// Fixed-response backend for tests and keyless demos.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    /// If set, return this instead of the default message.
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn transcribe(&self, turn: &PcmTurn) -> VoiceResult<String> {
        if let Some(ref r) = self.response {
            return Ok(r.clone());
        }
        Ok(format!(
            "[placeholder transcription: {} samples, {:.1}s]",
            turn.samples.len(),
            turn.duration.as_secs_f32()
        ))
    }
}

/// OpenAI-compatible transcription backend (`{base}/audio/transcriptions`).
/// Configured via `STT_API_URL`, `STT_API_KEY`, `STT_MODEL` (default whisper-1).
#[derive(Debug, Clone)]
pub struct HttpStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Transcription model.
    pub model: String,
    client: reqwest::blocking::Client,
}

impl HttpStt {
    /// Build from environment. `STT_API_KEY` is required.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .map_err(|_| VoiceError::Config("STT requires STT_API_KEY".to_string()))?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    /// Create with explicit settings.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

impl SttBackend for HttpStt {
    fn transcribe(&self, turn: &PcmTurn) -> VoiceResult<String> {
        if turn.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = encode_wav(&turn.samples, turn.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));

        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {status}: {body}")));
        }

        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(samples: usize) -> PcmTurn {
        PcmTurn {
            samples: vec![0.0; samples],
            sample_rate: 16000,
            duration: Duration::from_millis(30),
        }
    }

    #[test]
    fn wav_header_is_well_formed() {
        let wav = encode_wav(&[0.0, 0.5, -0.5, 1.0], 16000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        // 44-byte header plus 2 bytes per sample
        assert_eq!(wav.len(), 44 + 4 * 2);
        let data_len = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_len, 8);
    }

    #[test]
    fn placeholder_reports_turn_shape() {
        let stt = PlaceholderStt::new();
        let text = stt.transcribe(&turn(480)).unwrap();
        assert!(text.contains("480"));
    }

    #[test]
    fn placeholder_with_response() {
        let stt = PlaceholderStt::with_response("hello tutor");
        assert_eq!(stt.transcribe(&turn(0)).unwrap(), "hello tutor");
    }
}
