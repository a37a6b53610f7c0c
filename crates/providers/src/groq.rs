//! Groq chat completions over the OpenAI-compatible endpoint.
//!
//! Requests are sent with `stream: true`; the server-sent event body is folded
//! into a single completion before structured extraction.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackbridge_core::{parse_structured, BridgeError, LanguageModel, StructuredRecord};
use tracing::debug;

use crate::http;

const PROVIDER: &str = "groq";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Accumulates `choices[0].delta.content` pieces from an SSE byte stream.
///
/// Chunks may split lines anywhere, including inside a multi-byte character,
/// so raw bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    content: String,
    done: bool,
}

impl SseAccumulator {
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), BridgeError> {
        self.pending.extend_from_slice(bytes);
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.consume_line(&line)?;
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish(mut self) -> Result<String, BridgeError> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.consume_line(&line)?;
        }
        Ok(self.content)
    }

    fn consume_line(&mut self, raw: &[u8]) -> Result<(), BridgeError> {
        if self.done {
            return Ok(());
        }
        let line = std::str::from_utf8(raw)
            .map_err(|_| BridgeError::parse("groq stream contained invalid utf-8"))?
            .trim();
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }
        if data.is_empty() {
            return Ok(());
        }

        let chunk: StreamChunk = http::decode(PROVIDER, data)?;
        if let Some(piece) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
        {
            self.content.push_str(&piece);
        }
        Ok(())
    }
}

pub struct GroqClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl GroqClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self { http, base_url: base_url.into(), model: model.into(), api_key }
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete_structured(&self, prompt: &str) -> Result<StructuredRecord, BridgeError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| BridgeError::Auth("GROQ_API_KEY is not configured".to_owned()))?;
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: 1.0,
            max_tokens: MAX_TOKENS,
            top_p: 1.0,
            stream: true,
        };
        let url = format!("{}/openai/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let request = self.http.post(url).bearer_auth(api_key.expose_secret()).json(&body);
        let mut response = http::send(PROVIDER, request).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        let text = if is_json {
            let completion: Completion = http::read_json(PROVIDER, response).await?;
            completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| BridgeError::parse("groq completion has no message content"))?
        } else {
            let mut accumulator = SseAccumulator::default();
            while let Some(chunk) = response.chunk().await.map_err(|error| {
                BridgeError::Network(format!("{PROVIDER}: {}", error.without_url()))
            })? {
                accumulator.push(&chunk)?;
                if accumulator.is_done() {
                    break;
                }
            }
            accumulator.finish()?
        };

        debug!(chars = text.len(), model = %self.model, "groq completion received");
        parse_structured(&text)
    }
}
