use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slackbridge_core::{BridgeError, CalendarProvider, NewCalendarEvent};
use tracing::info;

use crate::google_auth::GoogleAuthManager;
use crate::http;

const PROVIDER: &str = "google-calendar";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest<'a> {
    summary: &'a str,
    start: EventTime<'a>,
    end: EventTime<'a>,
    conference_data: ConferenceRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceRequest {
    create_request: CreateConferenceRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConferenceRequest {
    request_id: String,
    conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Serialize)]
struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
struct EntryPoint {
    uri: String,
}

pub struct CalendarClient {
    http: Client,
    auth: Arc<GoogleAuthManager>,
    base_url: String,
}

impl CalendarClient {
    pub fn new(http: Client, auth: Arc<GoogleAuthManager>, base_url: impl Into<String>) -> Self {
        Self { http, auth, base_url: base_url.into() }
    }
}

fn format_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Keyed by the start minute, so repeated requests for one slot share an id.
fn conference_request_id(start: &NaiveDateTime) -> String {
    format!("unique-id-{}", start.format("%Y%m%d%H%M"))
}

#[async_trait]
impl CalendarProvider for CalendarClient {
    async fn create_meeting(&self, event: NewCalendarEvent) -> Result<String, BridgeError> {
        let token = self.auth.access_token().await?;
        let body = EventRequest {
            summary: &event.title,
            start: EventTime { date_time: format_time(&event.start), time_zone: &event.time_zone },
            end: EventTime { date_time: format_time(&event.end), time_zone: &event.time_zone },
            conference_data: ConferenceRequest {
                create_request: CreateConferenceRequest {
                    request_id: conference_request_id(&event.start),
                    conference_solution_key: ConferenceSolutionKey { kind: "hangoutsMeet" },
                },
            },
        };

        let url = format!(
            "{}/calendar/v3/calendars/primary/events",
            self.base_url.trim_end_matches('/')
        );
        let request = self
            .http
            .post(url)
            .bearer_auth(&token)
            .query(&[("conferenceDataVersion", "1")])
            .json(&body);
        let response = http::send(PROVIDER, request).await?;
        let created: EventResponse = http::read_json(PROVIDER, response).await?;

        let link = created
            .conference_data
            .and_then(|data| data.entry_points.into_iter().next())
            .map(|entry| entry.uri)
            .ok_or_else(|| BridgeError::parse("calendar event has no conference entry point"))?;

        info!(
            event_name = "egress.calendar.meeting_created",
            event_id = created.id.as_deref().unwrap_or_default(),
            "calendar meeting created"
        );
        Ok(link)
    }
}
