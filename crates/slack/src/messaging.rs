use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackbridge_core::{BridgeError, Messenger, OutboundNotification};
use slackbridge_providers::http;
use tracing::debug;

const PROVIDER: &str = "slack";

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    mrkdwn: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts notifications through the Web API `chat.postMessage` method.
pub struct SlackMessenger {
    http: Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl SlackMessenger {
    pub fn new(http: Client, api_base_url: impl Into<String>, bot_token: SecretString) -> Self {
        Self { http, api_base_url: api_base_url.into(), bot_token }
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn post(&self, notification: &OutboundNotification) -> Result<(), BridgeError> {
        let url = format!("{}/chat.postMessage", self.api_base_url.trim_end_matches('/'));
        let body = PostMessageRequest {
            channel: &notification.channel_id,
            text: &notification.text,
            mrkdwn: true,
        };

        let request =
            self.http.post(url).bearer_auth(self.bot_token.expose_secret()).json(&body);
        let response = http::send(PROVIDER, request).await?;
        let status = response.status();
        let parsed: PostMessageResponse = http::read_json(PROVIDER, response).await?;
        if !parsed.ok {
            return Err(BridgeError::Provider {
                provider: PROVIDER,
                status: status.as_u16(),
                body: parsed.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        debug!(channel_id = %notification.channel_id, "slack message posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use reqwest::Client;
    use serde_json::json;
    use slackbridge_core::{BridgeError, Messenger, OutboundNotification};

    use super::SlackMessenger;

    fn notification() -> OutboundNotification {
        OutboundNotification { channel_id: "C123".to_owned(), text: "📬 hello".to_owned() }
    }

    #[tokio::test]
    async fn posts_channel_text_with_bearer_token() {
        let mut server = Server::new_async().await;
        let post = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::Json(json!({
                "channel": "C123",
                "text": "📬 hello",
                "mrkdwn": true
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"channel":"C123","ts":"1.2"}"#)
            .expect(1)
            .create_async()
            .await;

        let messenger =
            SlackMessenger::new(Client::new(), server.url(), "xoxb-test".to_owned().into());
        messenger.post(&notification()).await.expect("posted");
        post.assert_async().await;
    }

    #[tokio::test]
    async fn ok_false_is_a_provider_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;

        let messenger =
            SlackMessenger::new(Client::new(), server.url(), "xoxb-test".to_owned().into());
        let error = messenger.post(&notification()).await.expect_err("must fail");
        assert_eq!(
            error,
            BridgeError::Provider {
                provider: "slack",
                status: 200,
                body: "channel_not_found".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn http_failure_status_is_a_provider_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let messenger =
            SlackMessenger::new(Client::new(), server.url(), "xoxb-test".to_owned().into());
        assert!(matches!(
            messenger.post(&notification()).await,
            Err(BridgeError::Provider { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(502)
            .with_body("x".repeat(2_000))
            .create_async()
            .await;

        let messenger =
            SlackMessenger::new(Client::new(), server.url(), "xoxb-test".to_owned().into());
        match messenger.post(&notification()).await {
            Err(BridgeError::Provider { provider: "slack", status: 502, body }) => {
                assert_eq!(body.chars().count(), 501);
                assert!(body.ends_with('…'));
            }
            other => panic!("expected truncated provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_errors_omit_the_request_url() {
        let messenger = SlackMessenger::new(
            Client::new(),
            "http://127.0.0.1:9/secret-path",
            "xoxb-test".to_owned().into(),
        );
        match messenger.post(&notification()).await {
            Err(BridgeError::Network(message)) => {
                assert!(message.starts_with("slack: "));
                assert!(!message.contains("secret-path"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
