//! Speech capture: engage the microphone, detect one utterance, transcribe it.
//!
//! `MicCapture` runs the cpal stream and VAD gap logic on a dedicated thread
//! (the stream handle is not `Send` on every platform) and hands the buffered
//! turn to an [`SttBackend`] on the blocking pool. Exactly one utterance or
//! one failure per call; the microphone is released on every exit path.

use crate::error::{VoiceError, VoiceResult};
use crate::stt::{PcmTurn, SttBackend};
use crate::vad::SpeechDetector;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// Yields exactly one recognized utterance per successful call.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Begin listening and resolve with one utterance, or an error when the
    /// attempt ends without a result. Implementations must reject a call
    /// while a capture is already in flight.
    async fn capture_utterance(&self) -> VoiceResult<String>;
}

/// Tuning for the microphone capture path.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate; must be VAD-supported (default 16000).
    pub sample_rate: u32,
    /// Silence after speech that commits the utterance (default 800ms).
    pub gap: Duration,
    /// Speech shorter than this is dropped as a blip (default 200ms).
    pub min_speech: Duration,
    /// Upper bound on waiting for speech to start. Elapsing ends the attempt
    /// without a result, mirroring platform recognizers (default 8s).
    pub max_wait: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            gap: Duration::from_millis(800),
            min_speech: Duration::from_millis(200),
            max_wait: Duration::from_secs(8),
        }
    }
}

/// Microphone capture adapter: cpal input stream → 30ms VAD frames → gap
/// logic → one PCM turn → STT transcription.
pub struct MicCapture {
    config: CaptureConfig,
    stt: Arc<dyn SttBackend>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl MicCapture {
    /// Fails fast with `CaptureUnavailable` when the host has no input
    /// device, before any capture is attempted.
    pub fn new(config: CaptureConfig, stt: Arc<dyn SttBackend>) -> VoiceResult<Self> {
        if cpal::default_host().default_input_device().is_none() {
            return Err(VoiceError::CaptureUnavailable(
                "no default input device".to_string(),
            ));
        }
        Ok(Self {
            config,
            stt,
            in_flight: AtomicBool::new(false),
        })
    }

    async fn listen_once(&self) -> VoiceResult<PcmTurn> {
        let (turn_tx, turn_rx) = oneshot::channel::<VoiceResult<PcmTurn>>();
        let config = self.config.clone();

        // Dedicated thread: the cpal stream handle must stay on one thread.
        std::thread::spawn(move || {
            let _ = turn_tx.send(run_mic_turn(&config));
        });

        turn_rx
            .await
            .map_err(|_| VoiceError::Capture("capture thread ended unexpectedly".to_string()))?
    }
}

#[async_trait]
impl SpeechCapture for MicCapture {
    async fn capture_utterance(&self) -> VoiceResult<String> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(VoiceError::Capture("capture already in progress".to_string()));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let turn = self.listen_once().await?;
        debug!(
            samples = turn.samples.len(),
            secs = turn.duration.as_secs_f32(),
            "turn committed, transcribing"
        );

        let stt = Arc::clone(&self.stt);
        let text = tokio::task::spawn_blocking(move || stt.transcribe(&turn))
            .await
            .map_err(|e| VoiceError::Stt(format!("transcription task failed: {e}")))??;
        Ok(text)
    }
}

/// One blocking microphone session: returns when a turn commits, the
/// no-speech deadline elapses, or the stream dies. The stream is a local and
/// drops on every return, which releases the microphone.
fn run_mic_turn(config: &CaptureConfig) -> VoiceResult<PcmTurn> {
    let mut detector = SpeechDetector::new(config.sample_rate)?;
    let frame_size = detector.frame_size();

    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| VoiceError::CaptureUnavailable("no default input device".to_string()))?;
    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(frame_size as u32),
    };

    let (frame_tx, frame_rx) = std::sync::mpsc::channel::<Vec<f32>>();
    let mut pending = Vec::with_capacity(frame_size);
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    pending.push(sample);
                    if pending.len() >= frame_size {
                        let frame =
                            std::mem::replace(&mut pending, Vec::with_capacity(frame_size));
                        if frame_tx.send(frame).is_err() {
                            return;
                        }
                    }
                }
            },
            |err| warn!("input stream error: {err}"),
            None,
        )
        .map_err(|e| VoiceError::Capture(format!("input stream: {e}")))?;
    stream
        .play()
        .map_err(|e| VoiceError::Capture(format!("input stream start: {e}")))?;

    debug!(
        gap_ms = config.gap.as_millis() as u64,
        max_wait_ms = config.max_wait.as_millis() as u64,
        "microphone engaged"
    );

    let opened = Instant::now();
    let mut buffer: Vec<f32> = Vec::new();
    let mut speech_start: Option<Instant> = None;
    let mut last_speech: Option<Instant> = None;

    loop {
        let frame = match frame_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                if speech_start.is_none() && opened.elapsed() >= config.max_wait {
                    return Err(VoiceError::Capture("no speech before deadline".to_string()));
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(VoiceError::Capture("audio stream closed".to_string()));
            }
        };
        if frame.len() != frame_size {
            continue;
        }

        let now = Instant::now();
        let voiced = detector.is_speech(&frame).unwrap_or(false);

        if voiced {
            if speech_start.is_none() {
                debug!("speech started");
                speech_start = Some(now);
            }
            last_speech = Some(now);
            buffer.extend_from_slice(&frame);
        } else if let Some(start) = speech_start {
            // trailing context is kept so the STT hears the utterance end
            buffer.extend_from_slice(&frame);
            let silence = last_speech.map(|t| now.duration_since(t)).unwrap_or_default();
            if silence >= config.gap {
                let spoken = last_speech
                    .map(|t| t.duration_since(start))
                    .unwrap_or_default();
                if spoken < config.min_speech {
                    return Err(VoiceError::Capture(format!(
                        "speech too short ({}ms)",
                        spoken.as_millis()
                    )));
                }
                debug!(ms = spoken.as_millis() as u64, "gap detected, committing turn");
                return Ok(PcmTurn {
                    samples: buffer,
                    sample_rate: config.sample_rate,
                    duration: spoken,
                });
            }
        } else if opened.elapsed() >= config.max_wait {
            return Err(VoiceError::Capture("no speech before deadline".to_string()));
        }
    }
}

/// Deterministic capture for tests and keyless demos: yields queued
/// utterances in order, then capture failures once drained.
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    queue: Mutex<VecDeque<VoiceResult<String>>>,
}

impl ScriptedCapture {
    pub fn new<I, S>(utterances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(utterances.into_iter().map(|u| Ok(u.into())).collect()),
        }
    }

    pub async fn push(&self, utterance: impl Into<String>) {
        self.queue.lock().await.push_back(Ok(utterance.into()));
    }

    pub async fn push_failure(&self, reason: impl Into<String>) {
        self.queue
            .lock()
            .await
            .push_back(Err(VoiceError::Capture(reason.into())));
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    async fn capture_utterance(&self) -> VoiceResult<String> {
        self.queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(VoiceError::Capture("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_config_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.gap, Duration::from_millis(800));
        assert_eq!(config.min_speech, Duration::from_millis(200));
        assert_eq!(config.max_wait, Duration::from_secs(8));
    }

    #[tokio::test]
    async fn scripted_capture_yields_in_order_then_fails() {
        let capture = ScriptedCapture::new(["first", "second"]);
        assert_eq!(capture.capture_utterance().await.unwrap(), "first");
        assert_eq!(capture.capture_utterance().await.unwrap(), "second");
        let err = capture.capture_utterance().await.unwrap_err();
        assert!(err.is_capture_miss());
    }

    #[tokio::test]
    async fn scripted_capture_failure_is_a_miss() {
        let capture = ScriptedCapture::default();
        capture.push_failure("engine error").await;
        assert!(capture.capture_utterance().await.unwrap_err().is_capture_miss());
    }
}
