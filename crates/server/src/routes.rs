use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Form, Router};
use slackbridge_providers::GoogleAuthManager;
use slackbridge_slack::{SlashCommand, SlashCommandPayload};
use tracing::error;

use crate::dispatch::Dispatcher;
use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub google_auth: Arc<GoogleAuthManager>,
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health::health));
    for command in SlashCommand::ALL {
        router = router.route(
            command.path(),
            post(move |State(state): State<AppState>, Form(payload): Form<SlashCommandPayload>| {
                handle_command(state, command, payload)
            }),
        );
    }
    router.with_state(state)
}

/// Returns the ack as the `text/plain` body; the work itself runs in the background.
async fn handle_command(
    state: AppState,
    command: SlashCommand,
    payload: SlashCommandPayload,
) -> String {
    let invocation = payload.into_invocation(command);
    state.dispatcher.dispatch(command, invocation).text
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let result = axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await;
    if let Err(error) = &result {
        error!(
            event_name = "system.http.error",
            correlation_id = "server",
            error = %error,
            "http server terminated unexpectedly"
        );
    }
    result
}
