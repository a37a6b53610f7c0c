//! Per-command background workflows and the Slack text they produce.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use slackbridge_core::{
    BridgeError, CalendarProvider, InboxSummary, LanguageModel, MailProvider, MeetingFields,
    NewCalendarEvent, TaskBoardProvider, TrelloCard, TrelloCardDetails,
};

pub const HELLO_TEXT: &str = "👋 Hello! How can I assist you today?";
pub const INBOX_MAX_RESULTS: u32 = 5;
pub const SEARCH_LIMIT: u32 = 5;

/// Provider handles shared by every workflow.
#[derive(Clone)]
pub struct Services {
    pub mail: Arc<dyn MailProvider>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub board: Arc<dyn TaskBoardProvider>,
    pub gemini: Arc<dyn LanguageModel>,
    pub groq: Arc<dyn LanguageModel>,
    pub settings: WorkflowSettings,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub time_zone: String,
    pub board_name: String,
    pub list_name: String,
}

pub async fn check_inbox(mail: &dyn MailProvider, mention: &str) -> Result<String, BridgeError> {
    let inbox = mail.unread_inbox(INBOX_MAX_RESULTS).await?;
    Ok(format_inbox(mention, &inbox))
}

pub fn format_inbox(mention: &str, inbox: &InboxSummary) -> String {
    let mut message = format!("📬 {mention} You have *{}* unread emails.", inbox.unread_count);
    if !inbox.emails.is_empty() {
        let blocks: Vec<String> = inbox
            .emails
            .iter()
            .map(|email| format!("*Subject:* {}\n*Snippet:* {}", email.subject, email.snippet))
            .collect();
        message.push_str("\n\nHere are the latest unread emails:\n\n");
        message.push_str(&blocks.join("\n\n"));
    }
    message
}

/// Wall-clock time in `time_zone`; an unrecognized zone name reads as UTC.
pub fn now_in_zone(now: DateTime<Utc>, time_zone: &str) -> NaiveDateTime {
    match time_zone.parse::<Tz>() {
        Ok(zone) => now.with_timezone(&zone).naive_local(),
        Err(_) => now.naive_utc(),
    }
}

pub fn meeting_prompt(request: &str, now: NaiveDateTime) -> String {
    format!(
        r#"Extract the meeting title, start time, and end time from this request.
The current local date and time is {now}.

Request: "{request}"

Format your response as JSON:
{{
  "title": "Meeting title here",
  "start_time": "2025-05-10T15:00",
  "end_time": "2025-05-10T15:30"
}}"#,
        now = now.format("%Y-%m-%dT%H:%M"),
    )
}

pub async fn create_meeting(
    model: &dyn LanguageModel,
    calendar: &dyn CalendarProvider,
    time_zone: &str,
    mention: &str,
    request: &str,
) -> Result<String, BridgeError> {
    let prompt = meeting_prompt(request, now_in_zone(Utc::now(), time_zone));
    let record = model.complete_structured(&prompt).await?;
    let fields = MeetingFields::from_record(&record)?;
    let link = calendar
        .create_meeting(NewCalendarEvent {
            title: fields.title,
            start: fields.start_time,
            end: fields.end_time,
            time_zone: time_zone.to_owned(),
        })
        .await?;

    Ok(format!("✅ {mention} Google Meet created: <{link}>"))
}

/// Resolves the configured board and list by name, then creates the card there.
pub async fn create_card(
    board: &dyn TaskBoardProvider,
    settings: &WorkflowSettings,
    mention: &str,
    title: &str,
    description: &str,
) -> Result<String, BridgeError> {
    let board_id = board.find_board_id(&settings.board_name).await?;
    let list_id = board.find_list_id(&board_id, &settings.list_name).await?;
    let card = board.create_card(&list_id, title, description).await?;

    Ok(format!("✅ {mention} Trello card created: <{}>", card.short_url))
}

pub async fn search_cards(
    board: &dyn TaskBoardProvider,
    query: &str,
) -> Result<String, BridgeError> {
    let cards = board.search_cards(query, SEARCH_LIMIT).await?;
    Ok(format_search(query, &cards))
}

pub fn format_search(query: &str, cards: &[TrelloCard]) -> String {
    if cards.is_empty() {
        return format!("❌ No cards found matching: *{query}*");
    }

    let mut message = format!("📋 Found {} card(s) for *{query}*:\n", cards.len());
    for card in cards {
        message.push_str(&format!("• *{}*\n🔗 <{}>\n", card.name, card.short_url));
    }
    message
}

/// Looks up the first search match and reports its full details.
pub async fn card_details(
    board: &dyn TaskBoardProvider,
    query: &str,
) -> Result<String, BridgeError> {
    let cards = board.search_cards(query, SEARCH_LIMIT).await?;
    let Some(first) = cards.first() else {
        return Ok(format!("❌ No Trello card found with name: *{query}*"));
    };

    let details = board.card_details(&first.id).await?;
    Ok(format_card_details(&details))
}

pub fn format_card_details(details: &TrelloCardDetails) -> String {
    let desc = if details.desc.is_empty() { "No description" } else { details.desc.as_str() };
    let due = details.due.as_deref().unwrap_or("Not set");
    format!("📌 *{}*\n📝 {desc}\n📅 Due: {due}\n🔗 <{}>", details.name, details.url)
}

pub fn assistant_prompt(question: &str) -> String {
    format!(
        r#"You are a helpful assistant in Slack. Answer the user's question based on query
and provide a JSON response. The user query is: "{question}".
Format your response as JSON:
{{
  "response": "Your response here"
}}"#
    )
}

pub async fn ask_model(
    model: &dyn LanguageModel,
    mention: &str,
    question: &str,
) -> Result<String, BridgeError> {
    let record = model.complete_structured(&assistant_prompt(question)).await?;
    let response = record.required_str("response")?;
    Ok(format!("💬 {mention} {response}"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use slackbridge_core::{EmailSummary, InboxSummary, TrelloCard, TrelloCardDetails};

    use super::{
        assistant_prompt, format_card_details, format_inbox, format_search, meeting_prompt,
        now_in_zone,
    };

    fn card(name: &str, url: &str) -> TrelloCard {
        TrelloCard {
            id: format!("id-{name}"),
            name: name.to_owned(),
            short_url: url.to_owned(),
            desc: String::new(),
        }
    }

    #[test]
    fn inbox_message_lists_subjects_and_snippets() {
        let inbox = InboxSummary {
            unread_count: 2,
            emails: vec![
                EmailSummary::new(Some("Q3 report".to_owned()), "numbers"),
                EmailSummary::new(None, "hey"),
            ],
        };

        assert_eq!(
            format_inbox("<@U1>", &inbox),
            "📬 <@U1> You have *2* unread emails.\n\nHere are the latest unread emails:\n\n\
             *Subject:* Q3 report\n*Snippet:* numbers\n\n*Subject:* No Subject\n*Snippet:* hey"
        );
    }

    #[test]
    fn empty_inbox_message_has_only_the_count() {
        assert_eq!(
            format_inbox("<@U1>", &InboxSummary::default()),
            "📬 <@U1> You have *0* unread emails."
        );
    }

    #[test]
    fn search_message_lists_every_card() {
        let cards = [card("Fix login", "https://t/1"), card("Login docs", "https://t/2")];
        assert_eq!(
            format_search("login", &cards),
            "📋 Found 2 card(s) for *login*:\n• *Fix login*\n🔗 <https://t/1>\n\
             • *Login docs*\n🔗 <https://t/2>\n"
        );
        assert_eq!(format_search("nope", &[]), "❌ No cards found matching: *nope*");
    }

    #[test]
    fn card_details_fall_back_for_blank_description_and_due() {
        let details = TrelloCardDetails {
            name: "Fix login".to_owned(),
            desc: String::new(),
            due: None,
            url: "https://trello.com/c/abc".to_owned(),
            id_list: None,
        };
        assert_eq!(
            format_card_details(&details),
            "📌 *Fix login*\n📝 No description\n📅 Due: Not set\n🔗 <https://trello.com/c/abc>"
        );
    }

    #[test]
    fn prompts_embed_the_user_request() {
        let now = NaiveDate::from_ymd_opt(2025, 5, 9)
            .and_then(|day| day.and_hms_opt(9, 30, 0))
            .expect("timestamp");
        let prompt = meeting_prompt("Standup tomorrow 10am", now);
        assert!(prompt.contains(r#"Request: "Standup tomorrow 10am""#));
        assert!(prompt.contains("2025-05-09T09:30"));
        assert!(prompt.contains(r#""start_time": "2025-05-10T15:00""#));

        assert!(assistant_prompt("why?").contains(r#"The user query is: "why?"."#));
    }

    #[test]
    fn prompt_clock_follows_configured_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 5, 9, 20, 0, 0).single().expect("instant");

        let kolkata = now_in_zone(instant, "Asia/Kolkata");
        assert_eq!(kolkata.format("%Y-%m-%dT%H:%M").to_string(), "2025-05-10T01:30");

        let fallback = now_in_zone(instant, "Mars/Olympus_Mons");
        assert_eq!(fallback.format("%Y-%m-%dT%H:%M").to_string(), "2025-05-09T20:00");
    }
}
