//! Provider seams. Each external service sits behind one of these traits so
//! workflows can run against the reqwest clients or against recording fakes.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::errors::BridgeError;
use crate::extraction::StructuredRecord;
use crate::invocation::OutboundNotification;

pub const SNIPPET_MAX_CHARS: usize = 150;
pub const DEFAULT_SUBJECT: &str = "No Subject";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSummary {
    pub subject: String,
    pub snippet: String,
}

impl EmailSummary {
    pub fn new(subject: Option<String>, snippet: &str) -> Self {
        Self {
            subject: subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_owned()),
            snippet: snippet.chars().take(SNIPPET_MAX_CHARS).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboxSummary {
    pub unread_count: usize,
    pub emails: Vec<EmailSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_zone: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrelloCard {
    pub id: String,
    pub name: String,
    pub short_url: String,
    pub desc: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrelloCardDetails {
    pub name: String,
    pub desc: String,
    pub due: Option<String>,
    pub url: String,
    pub id_list: Option<String>,
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn unread_inbox(&self, max_results: u32) -> Result<InboxSummary, BridgeError>;
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Creates the event with a video conference attached and returns the join link.
    async fn create_meeting(&self, event: NewCalendarEvent) -> Result<String, BridgeError>;
}

#[async_trait]
pub trait TaskBoardProvider: Send + Sync {
    async fn find_board_id(&self, board_name: &str) -> Result<String, BridgeError>;

    async fn find_list_id(&self, board_id: &str, list_name: &str) -> Result<String, BridgeError>;

    async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        desc: &str,
    ) -> Result<TrelloCard, BridgeError>;

    async fn search_cards(&self, query: &str, limit: u32) -> Result<Vec<TrelloCard>, BridgeError>;

    async fn card_details(&self, card_id: &str) -> Result<TrelloCardDetails, BridgeError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete_structured(&self, prompt: &str) -> Result<StructuredRecord, BridgeError>;
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn post(&self, notification: &OutboundNotification) -> Result<(), BridgeError>;
}
