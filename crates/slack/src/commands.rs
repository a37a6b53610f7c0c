use serde::Deserialize;
use slackbridge_core::{BridgeError, CommandInvocation};

/// Form body Slack posts for a slash command. Unused Slack fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl SlashCommandPayload {
    /// The route decides the command; the form's `command` field is informational only.
    pub fn into_invocation(self, command: SlashCommand) -> CommandInvocation {
        CommandInvocation::new(command.name(), self.channel_id, self.user_id, self.text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlashCommand {
    Hello,
    Inbox,
    Meet,
    CreateCard,
    SearchCards,
    CardDetails,
    Gemini,
    Groq,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 8] = [
        Self::Hello,
        Self::Inbox,
        Self::Meet,
        Self::CreateCard,
        Self::SearchCards,
        Self::CardDetails,
        Self::Gemini,
        Self::Groq,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Inbox => "inbox",
            Self::Meet => "meet",
            Self::CreateCard => "create_card_trello",
            Self::SearchCards => "trellosearch",
            Self::CardDetails => "trello_card",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Hello => "/hello",
            Self::Inbox => "/inbox",
            Self::Meet => "/meet",
            Self::CreateCard => "/create_card_trello",
            Self::SearchCards => "/trellosearch",
            Self::CardDetails => "/trello_card",
            Self::Gemini => "/gemini",
            Self::Groq => "/groq",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.path() == path)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim_start_matches('/');
        Self::ALL.into_iter().find(|command| command.name() == name)
    }

    pub fn requires_argument(&self) -> bool {
        !matches!(self, Self::Hello | Self::Inbox)
    }

    pub fn usage(&self) -> &'static str {
        match self {
            Self::Hello => "❗ Usage: `/hello`",
            Self::Inbox => "❗ Usage: `/inbox`",
            Self::Meet => "❗ Usage: `/meet <meeting request, e.g. Standup tomorrow 10:00-10:30>`",
            Self::CreateCard => "❗ Usage: `/create_card_trello <card_title> [description]`",
            Self::SearchCards => "❗ Usage: `/trellosearch <search terms>`",
            Self::CardDetails => "❗ Usage: `/trello_card <card name>`",
            Self::Gemini => "❗ Usage: `/gemini <question>`",
            Self::Groq => "❗ Usage: `/groq <question>`",
        }
    }

    /// Immediate plain-text reply returned in the HTTP response body.
    pub fn ack_text(&self, text: &str) -> String {
        match self {
            Self::Hello => String::new(),
            Self::Inbox => "Checking inbox...".to_owned(),
            Self::Meet => format!("Creating meeting...Request: {text}"),
            Self::CreateCard => format!("Creating Trello card...Request: {text}"),
            Self::SearchCards => format!("🔍 Searching Trello cards...Request: {text}"),
            Self::CardDetails => format!("🔍 Fetching Trello card...Request: {text}"),
            Self::Gemini => format!("🔍 Processing your request in Gemini...Request: {text}"),
            Self::Groq => format!("🔍 Processing your request in Groq... : Request: {text}"),
        }
    }

    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Hello | Self::Gemini | Self::Groq => "❌ Error:",
            Self::Inbox => "❌ Failed to check inbox:",
            Self::Meet => "❌ Failed to create meeting:",
            Self::CreateCard => "❌ Trello error:",
            Self::SearchCards => "❌ Error searching Trello cards:",
            Self::CardDetails => "❌ Error retrieving card:",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandArgs {
    None,
    Text(String),
    Card { title: String, description: String },
}

pub fn parse_arguments(command: SlashCommand, text: &str) -> Result<CommandArgs, BridgeError> {
    let trimmed = text.trim();
    if !command.requires_argument() {
        return Ok(CommandArgs::None);
    }
    if trimmed.is_empty() {
        return Err(BridgeError::validation(command.usage()));
    }

    match command {
        SlashCommand::CreateCard => {
            let (title, description) = match trimmed.split_once(char::is_whitespace) {
                Some((title, rest)) => (title, rest.trim_start()),
                None => (trimmed, ""),
            };
            Ok(CommandArgs::Card { title: title.to_owned(), description: description.to_owned() })
        }
        _ => Ok(CommandArgs::Text(trimmed.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use slackbridge_core::BridgeError;

    use super::{parse_arguments, CommandArgs, SlashCommand, SlashCommandPayload};

    #[test]
    fn every_command_round_trips_through_its_path() {
        for command in SlashCommand::ALL {
            assert_eq!(SlashCommand::from_path(command.path()), Some(command));
            assert_eq!(SlashCommand::from_name(&format!("/{}", command.name())), Some(command));
        }
        assert_eq!(SlashCommand::from_path("/unknown"), None);
    }

    #[test]
    fn create_card_splits_title_from_description() {
        let args = parse_arguments(SlashCommand::CreateCard, "  Fix   login bug on mobile ")
            .expect("valid args");
        assert_eq!(
            args,
            CommandArgs::Card {
                title: "Fix".to_owned(),
                description: "login bug on mobile".to_owned()
            }
        );

        let title_only = parse_arguments(SlashCommand::CreateCard, "Deploy").expect("title only");
        assert_eq!(
            title_only,
            CommandArgs::Card { title: "Deploy".to_owned(), description: String::new() }
        );
    }

    #[test]
    fn whitespace_only_text_is_rejected_with_usage_for_argument_commands() {
        for command in SlashCommand::ALL.into_iter().filter(SlashCommand::requires_argument) {
            let error = parse_arguments(command, " \t\n").expect_err("blank text must fail");
            assert_eq!(error, BridgeError::validation(command.usage()));
            assert!(error.to_string().starts_with("❗ Usage:"));
        }
    }

    #[test]
    fn hello_and_inbox_ignore_their_text() {
        assert_eq!(parse_arguments(SlashCommand::Hello, "").expect("hello"), CommandArgs::None);
        assert_eq!(
            parse_arguments(SlashCommand::Inbox, "anything").expect("inbox"),
            CommandArgs::None
        );
    }

    #[test]
    fn text_commands_receive_trimmed_text() {
        let args = parse_arguments(SlashCommand::Gemini, "  what is rust?  ").expect("gemini");
        assert_eq!(args, CommandArgs::Text("what is rust?".to_owned()));
    }

    #[test]
    fn acks_match_slack_facing_wording() {
        assert_eq!(SlashCommand::Hello.ack_text("ignored"), "");
        assert_eq!(SlashCommand::Inbox.ack_text(""), "Checking inbox...");
        assert_eq!(
            SlashCommand::CreateCard.ack_text("Fix login bug"),
            "Creating Trello card...Request: Fix login bug"
        );
        assert_eq!(
            SlashCommand::Groq.ack_text("hi"),
            "🔍 Processing your request in Groq... : Request: hi"
        );
    }

    #[test]
    fn payload_becomes_invocation_named_after_route() {
        let payload = SlashCommandPayload {
            command: Some("/something-else".to_owned()),
            text: "Fix".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
        };
        let invocation = payload.into_invocation(SlashCommand::CreateCard);
        assert_eq!(invocation.command, "create_card_trello");
        assert_eq!(invocation.channel_id, "C1");
        assert_eq!(invocation.text, "Fix");
    }
}
