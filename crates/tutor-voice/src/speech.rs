//! Speech output: at most one utterance audible at any instant.
//!
//! `AudioSpeaker` keeps the playback sink on a dedicated player thread (the
//! rodio output stream handle is not `Send` on every platform). A `Play`
//! command halts the sink before enqueueing the new source, which is what
//! enforces the cancel-on-new-speak policy, and is acknowledged only after
//! the speaking flag is raised — `speak` never returns ahead of the flag.

use crate::error::{VoiceError, VoiceResult};
use crate::tts::TtsBackend;
use async_trait::async_trait;
use std::io::Cursor;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

/// Speaks one utterance at a time; `speak` preempts whatever is audible.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Synthesize and start speaking `text`, cancelling any utterance in
    /// progress. Empty text is a no-op. Returns once the new utterance is
    /// queued and reflected by [`is_speaking`](Self::is_speaking).
    async fn speak(&self, text: &str) -> VoiceResult<()>;

    /// Stop immediately and clear anything queued. Preemption is handled
    /// inside `speak`; this is the display layer's escape hatch (mute,
    /// shutdown).
    fn cancel(&self);

    fn is_speaking(&self) -> bool;

    /// Resolve once the current utterance (if any) has finished.
    async fn wait_until_done(&self);
}

/// Silent stand-in when no output device exists. Every operation is a no-op
/// and never errors; speech output is an enhancement, not a required path.
#[derive(Debug, Default)]
pub struct NullSpeaker;

#[async_trait]
impl SpeechOutput for NullSpeaker {
    async fn speak(&self, _text: &str) -> VoiceResult<()> {
        Ok(())
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    async fn wait_until_done(&self) {}
}

enum PlayerCmd {
    Play(Vec<u8>, oneshot::Sender<()>),
    Stop,
}

/// What the player loop drives. Seam over the rodio sink so the
/// halt-before-enqueue ordering is testable without an output device.
trait PlaybackSink {
    /// Stop playback immediately and clear the queue.
    fn halt(&self);

    /// Decode and queue audio bytes for playback.
    fn enqueue(&self, bytes: Vec<u8>) -> VoiceResult<()>;

    /// Whether the queue has drained.
    fn is_idle(&self) -> bool;
}

struct RodioSink {
    _stream: rodio::OutputStream,
    sink: rodio::Sink,
}

impl RodioSink {
    fn open() -> VoiceResult<Self> {
        let (stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| VoiceError::PlaybackUnavailable(e.to_string()))?;
        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| VoiceError::PlaybackUnavailable(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl PlaybackSink for RodioSink {
    fn halt(&self) {
        self.sink.stop();
    }

    fn enqueue(&self, bytes: Vec<u8>) -> VoiceResult<()> {
        use rodio::Source;
        let source = rodio::Decoder::new(Cursor::new(bytes))
            .map_err(|e| VoiceError::Playback(format!("decode failed: {e}")))?;
        self.sink.append(source.convert_samples::<f32>());
        Ok(())
    }

    fn is_idle(&self) -> bool {
        self.sink.empty()
    }
}

/// Rodio-backed speaker: TTS synthesis on the blocking pool, playback on a
/// dedicated player thread.
pub struct AudioSpeaker {
    tts: Arc<dyn TtsBackend>,
    cmd_tx: Sender<PlayerCmd>,
    speaking_rx: watch::Receiver<bool>,
}

impl AudioSpeaker {
    /// Spawns the player thread. Fails with `PlaybackUnavailable` when no
    /// output device can be opened; callers should then fall back to
    /// [`NullSpeaker`].
    pub fn new(tts: Arc<dyn TtsBackend>) -> VoiceResult<Self> {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<PlayerCmd>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<VoiceResult<()>>();
        let (speaking_tx, speaking_rx) = watch::channel(false);

        std::thread::spawn(move || {
            let sink = match RodioSink::open() {
                Ok(sink) => {
                    let _ = ready_tx.send(Ok(()));
                    sink
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            debug!("speaker ready");
            player_loop(&sink, &cmd_rx, &speaking_tx);
        });

        ready_rx
            .recv()
            .map_err(|_| VoiceError::PlaybackUnavailable("player thread died".to_string()))??;

        Ok(Self {
            tts,
            cmd_tx,
            speaking_rx,
        })
    }
}

#[async_trait]
impl SpeechOutput for AudioSpeaker {
    async fn speak(&self, text: &str) -> VoiceResult<()> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let tts = Arc::clone(&self.tts);
        let bytes = tokio::task::spawn_blocking(move || tts.synthesize(&text))
            .await
            .map_err(|e| VoiceError::Tts(format!("synthesis task failed: {e}")))??;
        if bytes.is_empty() {
            debug!("TTS returned no audio, skipping playback");
            return Ok(());
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(PlayerCmd::Play(bytes, ack_tx))
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))?;
        // returning before the ack would let a caller observe the speaking
        // flag still down while the utterance is about to start
        ack_rx
            .await
            .map_err(|_| VoiceError::Playback("player thread gone".to_string()))
    }

    fn cancel(&self) {
        let _ = self.cmd_tx.send(PlayerCmd::Stop);
    }

    fn is_speaking(&self) -> bool {
        *self.speaking_rx.borrow()
    }

    async fn wait_until_done(&self) {
        let mut rx = self.speaking_rx.clone();
        let _ = rx.wait_for(|speaking| !speaking).await;
    }
}

fn player_loop(
    sink: &dyn PlaybackSink,
    cmd_rx: &Receiver<PlayerCmd>,
    speaking_tx: &watch::Sender<bool>,
) {
    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(PlayerCmd::Play(bytes, ack)) => {
                // cancel-on-new-speak: only the newest reply is ever audible
                sink.halt();
                match sink.enqueue(bytes) {
                    Ok(()) => {
                        let _ = speaking_tx.send(true);
                    }
                    Err(e) => {
                        warn!("could not queue synthesized audio: {e}");
                        let _ = speaking_tx.send(false);
                    }
                }
                // the flag is settled before the ack, so `speak` returns
                // with `is_speaking` already reflecting this utterance
                let _ = ack.send(());
            }
            Ok(PlayerCmd::Stop) => {
                sink.halt();
                let _ = speaking_tx.send(false);
            }
            Err(RecvTimeoutError::Timeout) => {
                if *speaking_tx.borrow() && sink.is_idle() {
                    let _ = speaking_tx.send(false);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                sink.halt();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread::JoinHandle;

    #[derive(Default)]
    struct FakeSink {
        ops: Mutex<Vec<String>>,
        idle: AtomicBool,
    }

    impl FakeSink {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn drain(&self) {
            self.idle.store(true, Ordering::SeqCst);
        }
    }

    impl PlaybackSink for FakeSink {
        fn halt(&self) {
            self.ops.lock().unwrap().push("halt".to_string());
            self.idle.store(true, Ordering::SeqCst);
        }

        fn enqueue(&self, bytes: Vec<u8>) -> VoiceResult<()> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("play:{}", String::from_utf8_lossy(&bytes)));
            self.idle.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_idle(&self) -> bool {
            self.idle.load(Ordering::SeqCst)
        }
    }

    fn spawn_loop(
        sink: Arc<FakeSink>,
    ) -> (
        Sender<PlayerCmd>,
        watch::Receiver<bool>,
        JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
        let (speaking_tx, speaking_rx) = watch::channel(false);
        let handle = std::thread::spawn(move || player_loop(sink.as_ref(), &cmd_rx, &speaking_tx));
        (cmd_tx, speaking_rx, handle)
    }

    async fn play(cmd_tx: &Sender<PlayerCmd>, name: &str) {
        let (ack_tx, ack_rx) = oneshot::channel();
        cmd_tx
            .send(PlayerCmd::Play(name.as_bytes().to_vec(), ack_tx))
            .unwrap();
        ack_rx.await.unwrap();
    }

    #[tokio::test]
    async fn play_halts_the_sink_before_every_enqueue() {
        let sink = Arc::new(FakeSink::default());
        let (cmd_tx, _speaking_rx, handle) = spawn_loop(Arc::clone(&sink));

        play(&cmd_tx, "first").await;
        play(&cmd_tx, "second").await;

        drop(cmd_tx);
        handle.join().unwrap();

        // only the newest utterance is ever audible; the trailing halt is
        // the shutdown cleanup
        assert_eq!(
            sink.ops(),
            vec!["halt", "play:first", "halt", "play:second", "halt"]
        );
    }

    #[tokio::test]
    async fn speaking_flag_is_up_once_play_is_acknowledged() {
        let sink = Arc::new(FakeSink::default());
        let (cmd_tx, speaking_rx, handle) = spawn_loop(Arc::clone(&sink));

        play(&cmd_tx, "reply").await;
        // no sleep: the ack alone must order the flag
        assert!(*speaking_rx.borrow());

        // and the flag clears once the sink drains
        sink.drain();
        let mut rx = speaking_rx.clone();
        rx.wait_for(|speaking| !speaking).await.unwrap();

        drop(cmd_tx);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn stop_halts_playback_and_clears_the_flag() {
        let sink = Arc::new(FakeSink::default());
        let (cmd_tx, speaking_rx, handle) = spawn_loop(Arc::clone(&sink));

        play(&cmd_tx, "reply").await;
        assert!(*speaking_rx.borrow());

        cmd_tx.send(PlayerCmd::Stop).unwrap();
        let mut rx = speaking_rx.clone();
        rx.wait_for(|speaking| !speaking).await.unwrap();
        assert!(sink.ops().last().unwrap() == "halt");

        drop(cmd_tx);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn null_speaker_is_a_silent_noop() {
        let speaker = NullSpeaker;
        speaker.speak("hello").await.unwrap();
        assert!(!speaker.is_speaking());
        speaker.cancel();
        speaker.wait_until_done().await;
    }

    // Requires an output device; run manually with --ignored.
    #[tokio::test]
    #[ignore]
    async fn speaker_reports_unavailable_or_ready() {
        use crate::tts::PlaceholderTts;
        match AudioSpeaker::new(Arc::new(PlaceholderTts)) {
            Ok(speaker) => {
                // placeholder synthesizes nothing, so speak is a no-op
                speaker.speak("hello").await.unwrap();
                assert!(!speaker.is_speaking());
            }
            Err(e) => assert!(matches!(e, VoiceError::PlaybackUnavailable(_))),
        }
    }
}
