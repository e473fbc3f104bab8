//! HTTP client for the dialogue backend's single request/response contract.
//!
//! One `POST {base}/chat` per send, body `{"query": "<utterance>"}`, reply
//! `{"text": "...", "emotion": "..."}`. No retries, no local state.

use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

/// Reply from the dialogue backend. A body missing `text` is a decode
/// failure; `emotion` is optional and drawn from an open vocabulary.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueReply {
    pub text: String,
    #[serde(default)]
    pub emotion: Option<String>,
}

/// Client for the dialogue backend.
#[derive(Debug, Clone)]
pub struct DialogueClient {
    base_url: String,
    client: reqwest::Client,
}

impl DialogueClient {
    /// `timeout` bounds the whole round-trip; elapsing counts as a network
    /// failure.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> VoiceResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { base_url, client })
    }

    /// Send one utterance and return the structured reply. Empty trimmed
    /// input is rejected before any network call.
    pub async fn send(&self, utterance: &str) -> VoiceResult<DialogueReply> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(VoiceError::EmptyUtterance);
        }

        let url = format!("{}/chat", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&ChatRequest { query: utterance })
            .send()
            .await
            .map_err(|e| VoiceError::Network(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Network(format!(
                "backend returned {status}: {body}"
            )));
        }

        res.json::<DialogueReply>()
            .await
            .map_err(|e| VoiceError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_utterance_rejected_without_network() {
        // port 9 is discard; a network attempt would error differently
        let client = DialogueClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.send("   ").await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyUtterance));
    }

    #[test]
    fn reply_decodes_without_emotion() {
        let reply: DialogueReply = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(reply.text, "hi");
        assert!(reply.emotion.is_none());
    }

    #[test]
    fn reply_missing_text_fails() {
        assert!(serde_json::from_str::<DialogueReply>(r#"{"emotion":"happy"}"#).is_err());
    }
}
