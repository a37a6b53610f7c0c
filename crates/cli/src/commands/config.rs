use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use slackbridge_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        field(
            "slack.bot_token",
            &["SLACKBRIDGE_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
            redact_token(config.slack.bot_token.expose_secret()),
        ),
        field(
            "slack.api_base_url",
            &["SLACKBRIDGE_SLACK_API_BASE_URL"],
            config.slack.api_base_url.clone(),
        ),
        field(
            "google.client_secret_path",
            &["SLACKBRIDGE_GOOGLE_CLIENT_SECRET_PATH"],
            config.google.client_secret_path.display().to_string(),
        ),
        field(
            "google.token_cache_path",
            &["SLACKBRIDGE_GOOGLE_TOKEN_CACHE_PATH"],
            config.google.token_cache_path.display().to_string(),
        ),
        field(
            "google.time_zone",
            &["SLACKBRIDGE_GOOGLE_TIME_ZONE"],
            config.google.time_zone.clone(),
        ),
        field(
            "trello.api_key",
            &["SLACKBRIDGE_TRELLO_API_KEY", "TRELLO_API_KEY"],
            redact_optional(config.trello.api_key.as_ref()),
        ),
        field(
            "trello.token",
            &["SLACKBRIDGE_TRELLO_TOKEN", "TRELLO_TOKEN"],
            redact_optional(config.trello.token.as_ref()),
        ),
        field(
            "trello.board_name",
            &["SLACKBRIDGE_TRELLO_BOARD_NAME"],
            config.trello.board_name.clone(),
        ),
        field(
            "trello.list_name",
            &["SLACKBRIDGE_TRELLO_LIST_NAME"],
            config.trello.list_name.clone(),
        ),
        field(
            "gemini.api_key",
            &["SLACKBRIDGE_GEMINI_API_KEY", "GEMINI_API_KEY"],
            redact_optional(config.gemini.api_key.as_ref()),
        ),
        field("gemini.model", &["SLACKBRIDGE_GEMINI_MODEL"], config.gemini.model.clone()),
        field(
            "groq.api_key",
            &["SLACKBRIDGE_GROQ_API_KEY", "GROQ_API_KEY"],
            redact_optional(config.groq.api_key.as_ref()),
        ),
        field("groq.model", &["SLACKBRIDGE_GROQ_MODEL"], config.groq.model.clone()),
        field(
            "server.bind_address",
            &["SLACKBRIDGE_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["SLACKBRIDGE_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.max_in_flight_tasks",
            &["SLACKBRIDGE_SERVER_MAX_IN_FLIGHT_TASKS"],
            config.server.max_in_flight_tasks.to_string(),
        ),
        field(
            "server.graceful_shutdown_secs",
            &["SLACKBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field(
            "server.http_timeout_secs",
            &["SLACKBRIDGE_SERVER_HTTP_TIMEOUT_SECS"],
            config.server.http_timeout_secs.to_string(),
        ),
        field(
            "logging.level",
            &["SLACKBRIDGE_LOGGING_LEVEL", "SLACKBRIDGE_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["SLACKBRIDGE_LOGGING_FORMAT", "SLACKBRIDGE_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn field(key: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key, env_keys, value }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("slackbridge.toml"), PathBuf::from("config/slackbridge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_optional(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        _ => "<unset>".to_string(),
    }
}

/// Keeps the Slack token kind (`xoxb`) visible and hides the rest.
pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
