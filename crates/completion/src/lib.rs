//! Completion provider boundary.
//!
//! The engine hands an ordered list of prompt parts to a
//! [`CompletionProvider`] and gets back a raw candidate string. The provider
//! may fail — network, auth, quota — and the engine treats every failure as
//! "no suggestion"; nothing here is load-bearing for input handling.
//!
//! [`GeminiClient`] is the production implementation, talking to the
//! `generateContent` endpoint with a bounded retry on rate limiting and
//! server errors.
#![warn(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod error;

pub use error::{Error, Result};

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Retries attempted on 429/5xx before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// External service producing a candidate continuation for typed text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a completion for the given ordered prompt parts.
    async fn complete(&self, parts: &[String]) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model` authenticated with `api_key`.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }

    /// Extract the concatenated text of the first candidate.
    fn first_candidate_text(resp: GenerateResponse) -> Result<String> {
        let candidate = resp.candidates.into_iter().next().ok_or(Error::Empty)?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.is_empty() {
            return Err(Error::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    async fn complete(&self, parts: &[String]) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: parts.iter().map(|t| TextPart { text: t.as_str() }).collect(),
            }],
        };

        // Bounded retry: rate limiting backs off longer than transient
        // server errors; other 4xx are not retriable.
        let mut last: Option<Error> = None;
        for attempt in 0..MAX_ATTEMPTS {
            let sent = self
                .http
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await;
            match sent {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: GenerateResponse = resp.json().await?;
                        let text = Self::first_candidate_text(parsed)?;
                        debug!(chars = text.len(), "completion_received");
                        return Ok(text);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let delay = Duration::from_secs(2u64.pow(attempt + 1));
                        warn!(%status, ?delay, "rate_limited_retrying");
                        tokio::time::sleep(delay).await;
                        last = Some(Error::Status(status.as_u16()));
                        continue;
                    }
                    if status.is_server_error() {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        warn!(%status, ?delay, "server_error_retrying");
                        tokio::time::sleep(delay).await;
                        last = Some(Error::Status(status.as_u16()));
                        continue;
                    }
                    return Err(Error::Status(status.as_u16()));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    warn!(error = %e, ?delay, "network_error_retrying");
                    tokio::time::sleep(delay).await;
                    last = Some(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last.unwrap_or(Error::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_preserves_part_order() {
        let parts = vec!["first".to_string(), "second".to_string()];
        let body = GenerateRequest {
            contents: vec![Content {
                parts: parts.iter().map(|t| TextPart { text: t.as_str() }).collect(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json["contents"][0]["parts"],
            serde_json::json!([{ "text": "first" }, { "text": "second" }])
        );
    }

    #[test]
    fn response_text_is_concatenated() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello " }, { "text": "world" }] }
            }]
        });
        let resp: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(
            GeminiClient::first_candidate_text(resp).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn empty_candidates_are_an_error() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            GeminiClient::first_candidate_text(resp),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "x" }], "role": "model" },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        });
        let resp: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(GeminiClient::first_candidate_text(resp).unwrap(), "x");
    }
}
