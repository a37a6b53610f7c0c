use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use slackbridge_core::{BridgeError, EmailSummary, InboxSummary, MailProvider};
use tracing::debug;

use crate::google_auth::GoogleAuthManager;
use crate::http;

const PROVIDER: &str = "gmail";

#[derive(Debug, Default, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageMetadata {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

impl MessageMetadata {
    fn subject(&self) -> Option<String> {
        self.payload.as_ref().and_then(|payload| {
            payload
                .headers
                .iter()
                .find(|header| header.name.eq_ignore_ascii_case("Subject"))
                .map(|header| header.value.clone())
        })
    }
}

pub struct GmailClient {
    http: Client,
    auth: Arc<GoogleAuthManager>,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: Client, auth: Arc<GoogleAuthManager>, base_url: impl Into<String>) -> Self {
        Self { http, auth, base_url: base_url.into() }
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn unread_inbox(&self, max_results: u32) -> Result<InboxSummary, BridgeError> {
        let token = self.auth.access_token().await?;
        let max_results = max_results.to_string();

        let request = self.http.get(self.messages_url()).bearer_auth(&token).query(&[
            ("labelIds", "INBOX"),
            ("labelIds", "UNREAD"),
            ("maxResults", max_results.as_str()),
        ]);
        let response = http::send(PROVIDER, request).await?;
        let listing: MessageList = http::read_json(PROVIDER, response).await?;
        debug!(count = listing.messages.len(), "listed unread gmail messages");

        let mut emails = Vec::with_capacity(listing.messages.len());
        for message in &listing.messages {
            let request = self
                .http
                .get(format!("{}/{}", self.messages_url(), message.id))
                .bearer_auth(&token)
                .query(&[("format", "metadata"), ("metadataHeaders", "Subject")]);
            let response = http::send(PROVIDER, request).await?;
            let metadata: MessageMetadata = http::read_json(PROVIDER, response).await?;
            emails.push(EmailSummary::new(metadata.subject(), &metadata.snippet));
        }

        Ok(InboxSummary { unread_count: emails.len(), emails })
    }
}
