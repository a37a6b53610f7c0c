use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackbridge_core::{parse_structured, BridgeError, LanguageModel, StructuredRecord};
use tracing::debug;

use crate::http;

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates.into_iter().next()?.content.parts.into_iter().next()?.text
    }
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl GeminiClient {
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
impl LanguageModel for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete_structured(&self, prompt: &str) -> Result<StructuredRecord, BridgeError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| BridgeError::Auth("GEMINI_API_KEY is not configured".to_owned()))?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = GenerateRequest { contents: [Content { parts: [RequestPart { text: prompt }] }] };

        let request =
            self.http.post(url).query(&[("key", api_key.expose_secret())]).json(&body);
        let response = http::send(PROVIDER, request).await?;
        let generated: GenerateResponse = http::read_json(PROVIDER, response).await?;

        let text = generated
            .first_text()
            .ok_or_else(|| BridgeError::parse("gemini response has no candidate text"))?;
        debug!(chars = text.len(), model = %self.model, "gemini completion received");
        parse_structured(&text)
    }
}
