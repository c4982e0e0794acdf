//! Gemini `generateContent` client.
//!
//! The system instruction travels in `systemInstruction`; context and question
//! go in a single user turn. Failed calls can optionally be retried with
//! exponential backoff, but only for errors that may succeed on a second try.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use deskrag_core::config::GenerationSettings;
use deskrag_core::error::GenerationError;
use deskrag_core::traits::{Generator, Prompt};

pub struct GeminiGenerator {
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        let timeout = settings.timeout();
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            timeout,
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay(),
            client,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn send_once(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            system_instruction: Content { role: None, parts: vec![Part { text: &prompt.system }] },
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: &prompt.user }] }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(GenerationError::Status { code: status.as_u16(), body: clip(&text, 500) });
        }
        answer_text(&text)
    }

    fn transport_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingCredentials);
        }

        let mut delay = self.retry_delay;
        let mut attempt = 0u32;
        loop {
            debug!("Calling {} (attempt {})", self.model, attempt + 1);
            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Generation failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Text of the first candidate in a `generateContent` response body.
pub fn answer_text(body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("no candidates".to_string()))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(GenerationError::InvalidResponse(format!("empty candidate (finish reason: {})", reason)));
    }
    Ok(text)
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
