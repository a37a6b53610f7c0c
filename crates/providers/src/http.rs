use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use slackbridge_core::BridgeError;
use tracing::warn;

const MAX_ERROR_BODY_CHARS: usize = 500;

pub fn build_client(timeout: Duration) -> Result<Client, BridgeError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| BridgeError::Network(format!("failed to build http client: {error}")))
}

/// Sends the request and turns transport failures and non-2xx statuses into `BridgeError`.
pub async fn send(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Response, BridgeError> {
    // URLs can carry API keys in their query string, so they are dropped from the message.
    let response = request
        .send()
        .await
        .map_err(|error| BridgeError::Network(format!("{provider}: {}", error.without_url())))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        event_name = "egress.provider.error_status",
        provider,
        status = status.as_u16(),
        "provider returned non-success status"
    );
    Err(BridgeError::Provider {
        provider,
        status: status.as_u16(),
        body: truncate(body.trim(), MAX_ERROR_BODY_CHARS),
    })
}

pub async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, BridgeError> {
    let body = response
        .text()
        .await
        .map_err(|error| BridgeError::Network(format!("{provider}: {}", error.without_url())))?;
    decode(provider, &body)
}

pub(crate) fn decode<T: DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> Result<T, BridgeError> {
    serde_json::from_str(body).map_err(|error| {
        BridgeError::parse(format!("{provider} response did not match schema: {error}"))
    })
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use slackbridge_core::BridgeError;

    use super::{decode, truncate};

    #[derive(Debug, Deserialize)]
    struct Shape {
        #[allow(dead_code)]
        id: String,
    }

    #[test]
    fn schema_mismatch_is_a_parse_error() {
        let result = decode::<Shape>("trello", r#"{"name":"no id"}"#);
        assert!(
            matches!(result, Err(BridgeError::Parse(ref message)) if message.contains("trello"))
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(600);
        let truncated = truncate(&body, 500);
        assert_eq!(truncated.chars().count(), 501);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate("short", 500), "short");
    }
}
