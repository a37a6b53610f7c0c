use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use slackbridge_core::{BridgeError, TaskBoardProvider, TrelloCard, TrelloCardDetails};
use tracing::{debug, info};

use crate::http;

const PROVIDER: &str = "trello";

#[derive(Debug, Deserialize)]
pub struct TrelloBoard {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TrelloList {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardPayload {
    id: String,
    name: String,
    short_url: String,
    #[serde(default)]
    desc: String,
}

impl From<CardPayload> for TrelloCard {
    fn from(card: CardPayload) -> Self {
        Self { id: card.id, name: card.name, short_url: card.short_url, desc: card.desc }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    cards: Vec<CardPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardDetailsPayload {
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    due: Option<String>,
    url: String,
    #[serde(default)]
    id_list: Option<String>,
}

pub struct TrelloClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    token: Option<SecretString>,
}

impl TrelloClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        token: Option<SecretString>,
    ) -> Self {
        Self { http, base_url: base_url.into(), api_key, token }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/1/{path}", self.base_url.trim_end_matches('/'))
    }

    fn auth_params(&self) -> Result<Vec<(&'static str, &str)>, BridgeError> {
        match (&self.api_key, &self.token) {
            (Some(key), Some(token)) => {
                Ok(vec![("key", key.expose_secret()), ("token", token.expose_secret())])
            }
            _ => Err(BridgeError::Auth(
                "trello api key and token are not configured (TRELLO_API_KEY / TRELLO_TOKEN)"
                    .to_owned(),
            )),
        }
    }
}

#[async_trait]
impl TaskBoardProvider for TrelloClient {
    async fn find_board_id(&self, board_name: &str) -> Result<String, BridgeError> {
        let request = self
            .http
            .get(self.url("members/me/boards"))
            .query(&self.auth_params()?)
            .query(&[("fields", "name,id")]);
        let response = http::send(PROVIDER, request).await?;
        let boards: Vec<TrelloBoard> = http::read_json(PROVIDER, response).await?;

        boards
            .into_iter()
            .find(|board| board.name.to_lowercase() == board_name.to_lowercase())
            .map(|board| board.id)
            .ok_or_else(|| BridgeError::NotFound(format!("Board '{board_name}' not found.")))
    }

    async fn find_list_id(&self, board_id: &str, list_name: &str) -> Result<String, BridgeError> {
        let request = self
            .http
            .get(self.url(&format!("boards/{board_id}/lists")))
            .query(&self.auth_params()?);
        let response = http::send(PROVIDER, request).await?;
        let lists: Vec<TrelloList> = http::read_json(PROVIDER, response).await?;

        lists
            .into_iter()
            .find(|list| list.name.to_lowercase() == list_name.to_lowercase())
            .map(|list| list.id)
            .ok_or_else(|| BridgeError::NotFound(format!("List '{list_name}' not found.")))
    }

    async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        desc: &str,
    ) -> Result<TrelloCard, BridgeError> {
        let request = self
            .http
            .post(self.url("cards"))
            .query(&self.auth_params()?)
            .query(&[("idList", list_id), ("name", name), ("desc", desc)]);
        let response = http::send(PROVIDER, request).await?;
        let card: CardPayload = http::read_json(PROVIDER, response).await?;

        info!(
            event_name = "egress.trello.card_created",
            card_id = %card.id,
            "trello card created"
        );
        Ok(card.into())
    }

    async fn search_cards(&self, query: &str, limit: u32) -> Result<Vec<TrelloCard>, BridgeError> {
        let limit = limit.to_string();
        let request = self.http.get(self.url("search")).query(&self.auth_params()?).query(&[
            ("query", query),
            ("modelTypes", "cards"),
            ("card_fields", "name,shortUrl,desc"),
            ("cards_limit", limit.as_str()),
        ]);
        let response = http::send(PROVIDER, request).await?;
        let found: SearchPayload = http::read_json(PROVIDER, response).await?;

        debug!(count = found.cards.len(), "trello search finished");
        Ok(found.cards.into_iter().map(TrelloCard::from).collect())
    }

    async fn card_details(&self, card_id: &str) -> Result<TrelloCardDetails, BridgeError> {
        let request = self
            .http
            .get(self.url(&format!("cards/{card_id}")))
            .query(&self.auth_params()?)
            .query(&[("fields", "name,desc,due,url,idList")]);
        let response = http::send(PROVIDER, request).await?;
        let card: CardDetailsPayload = http::read_json(PROVIDER, response).await?;

        Ok(TrelloCardDetails {
            name: card.name,
            desc: card.desc,
            due: card.due,
            url: card.url,
            id_list: card.id_list,
        })
    }
}
