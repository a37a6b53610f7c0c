use std::sync::Arc;

use slackbridge_core::{BridgeError, CommandInvocation};
use slackbridge_slack::{parse_arguments, CommandArgs, SlashCommand};
use tracing::info;

use crate::runner::{CommandJob, CommandWork, TaskHandle, TaskRunner};
use crate::workflows::{self, Services};

/// Synchronous reply for an inbound command plus the handle of the task it scheduled.
pub struct Ack {
    pub text: String,
    pub task: TaskHandle,
}

pub struct Dispatcher {
    runner: Arc<TaskRunner>,
    services: Services,
}

impl Dispatcher {
    pub fn new(runner: Arc<TaskRunner>, services: Services) -> Self {
        Self { runner, services }
    }

    pub fn runner(&self) -> &Arc<TaskRunner> {
        &self.runner
    }

    /// Validates the arguments and schedules exactly one background task.
    ///
    /// Never awaits provider I/O. Invalid input schedules only the usage notice.
    pub fn dispatch(&self, command: SlashCommand, invocation: CommandInvocation) -> Ack {
        info!(
            event_name = "ingress.command.received",
            correlation_id = %invocation.request_id,
            command = command.name(),
            channel_id = %invocation.channel_id,
            "slash command received"
        );

        match parse_arguments(command, &invocation.text) {
            Ok(args) => {
                let text = command.ack_text(&invocation.text);
                let work = build_work(&self.services, command, args, &invocation);
                let job = CommandJob::new(invocation, command.failure_prefix(), work);
                Ack { text, task: self.runner.submit(job) }
            }
            Err(error) => {
                info!(
                    event_name = "ingress.command.rejected",
                    correlation_id = %invocation.request_id,
                    command = command.name(),
                    "slash command rejected with usage"
                );
                let usage = error.to_string();
                let task = self.runner.submit(CommandJob::notice(invocation, usage.clone()));
                Ack { text: usage, task }
            }
        }
    }
}

fn build_work(
    services: &Services,
    command: SlashCommand,
    args: CommandArgs,
    invocation: &CommandInvocation,
) -> CommandWork {
    let services = services.clone();
    let mention = invocation.mention();

    match (command, args) {
        (SlashCommand::Hello, _) => {
            Box::pin(async { Ok::<_, BridgeError>(workflows::HELLO_TEXT.to_owned()) })
        }
        (SlashCommand::Inbox, _) => Box::pin(async move {
            workflows::check_inbox(services.mail.as_ref(), &mention).await
        }),
        (SlashCommand::Meet, CommandArgs::Text(request)) => Box::pin(async move {
            workflows::create_meeting(
                services.gemini.as_ref(),
                services.calendar.as_ref(),
                &services.settings.time_zone,
                &mention,
                &request,
            )
            .await
        }),
        (SlashCommand::CreateCard, CommandArgs::Card { title, description }) => {
            Box::pin(async move {
                workflows::create_card(
                    services.board.as_ref(),
                    &services.settings,
                    &mention,
                    &title,
                    &description,
                )
                .await
            })
        }
        (SlashCommand::SearchCards, CommandArgs::Text(query)) => Box::pin(async move {
            workflows::search_cards(services.board.as_ref(), &query).await
        }),
        (SlashCommand::CardDetails, CommandArgs::Text(query)) => Box::pin(async move {
            workflows::card_details(services.board.as_ref(), &query).await
        }),
        (SlashCommand::Gemini, CommandArgs::Text(question)) => Box::pin(async move {
            workflows::ask_model(services.gemini.as_ref(), &mention, &question).await
        }),
        (SlashCommand::Groq, CommandArgs::Text(question)) => Box::pin(async move {
            workflows::ask_model(services.groq.as_ref(), &mention, &question).await
        }),
        (command, args) => {
            let message = format!("unexpected arguments {args:?} for /{}", command.name());
            Box::pin(async move { Err::<String, _>(BridgeError::parse(message)) })
        }
    }
}
