use std::sync::Arc;
use std::time::Duration;

use slackbridge_core::config::{AppConfig, ConfigError, LoadOptions};
use slackbridge_core::BridgeError;
use slackbridge_providers::{
    build_client, CalendarClient, GeminiClient, GmailClient, GoogleAuthManager, GroqClient,
    TokenCache, TrelloClient,
};
use slackbridge_slack::SlackMessenger;
use thiserror::Error;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::routes::AppState;
use crate::runner::TaskRunner;
use crate::workflows::{Services, WorkflowSettings};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
    pub runner: Arc<TaskRunner>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] BridgeError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let http = build_client(Duration::from_secs(config.server.http_timeout_secs))
        .map_err(BootstrapError::HttpClient)?;

    let google = &config.google;
    let google_auth = Arc::new(GoogleAuthManager::new(
        http.clone(),
        TokenCache::new(&google.token_cache_path),
        &google.client_secret_path,
        &google.auth_url,
        &google.token_url,
    ));
    match google_auth.load().await {
        Ok(state) => info!(
            event_name = "system.bootstrap.google_credential",
            correlation_id = "bootstrap",
            state = state.as_str(),
            "google credential state resolved"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.google_credential",
            correlation_id = "bootstrap",
            error = %error,
            "google token cache unreadable; run `slackbridge authorize`"
        ),
    }

    let services = Services {
        mail: Arc::new(GmailClient::new(
            http.clone(),
            google_auth.clone(),
            &google.gmail_base_url,
        )),
        calendar: Arc::new(CalendarClient::new(
            http.clone(),
            google_auth.clone(),
            &google.calendar_base_url,
        )),
        board: Arc::new(TrelloClient::new(
            http.clone(),
            &config.trello.base_url,
            config.trello.api_key.clone(),
            config.trello.token.clone(),
        )),
        gemini: Arc::new(GeminiClient::new(
            http.clone(),
            &config.gemini.base_url,
            &config.gemini.model,
            config.gemini.api_key.clone(),
        )),
        groq: Arc::new(GroqClient::new(
            http.clone(),
            &config.groq.base_url,
            &config.groq.model,
            config.groq.api_key.clone(),
        )),
        settings: WorkflowSettings {
            time_zone: google.time_zone.clone(),
            board_name: config.trello.board_name.clone(),
            list_name: config.trello.list_name.clone(),
        },
    };

    let messenger = Arc::new(SlackMessenger::new(
        http,
        &config.slack.api_base_url,
        config.slack.bot_token.clone(),
    ));
    let runner = Arc::new(TaskRunner::new(messenger, config.server.max_in_flight_tasks));
    let dispatcher = Arc::new(Dispatcher::new(runner.clone(), services));

    if !config.trello.has_credentials() {
        warn!(
            event_name = "system.bootstrap.missing_credentials",
            correlation_id = "bootstrap",
            provider = "trello",
            "trello commands will fail until TRELLO_API_KEY and TRELLO_TOKEN are set"
        );
    }
    for (provider, llm) in [("gemini", &config.gemini), ("groq", &config.groq)] {
        if !llm.has_api_key() {
            warn!(
                event_name = "system.bootstrap.missing_credentials",
                correlation_id = "bootstrap",
                provider,
                "language model commands will fail until an api key is configured"
            );
        }
    }

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        max_in_flight_tasks = config.server.max_in_flight_tasks,
        "application bootstrap complete"
    );

    Ok(Application { state: AppState { dispatcher, google_auth }, runner, config })
}
