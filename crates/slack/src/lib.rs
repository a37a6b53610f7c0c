//! Slack-facing pieces of slackbridge.
//!
//! - **Slash commands** (`commands`) - payloads, argument parsing, acknowledgments
//! - **Messaging** (`messaging`) - `chat.postMessage` notifications
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add the slash commands `/hello`, `/inbox`, `/meet`, `/create_card_trello`,
//!    `/trellosearch`, `/trello_card`, `/gemini` and `/groq`, each pointing at the matching
//!    path on the server
//! 3. Grant the bot the `chat:write` scope and set `SLACK_BOT_TOKEN`

pub mod commands;
pub mod messaging;

pub use commands::{parse_arguments, CommandArgs, SlashCommand, SlashCommandPayload};
pub use messaging::SlackMessenger;
