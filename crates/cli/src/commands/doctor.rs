use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use slackbridge_core::config::{AppConfig, LlmConfig, LoadOptions};
use slackbridge_core::BridgeError;
use slackbridge_providers::{ClientSecrets, CredentialState, StoredCredential, TokenCache};

use super::config::redact_token;
use super::{escape_json, runtime, CommandResult, EXIT_NOT_READY};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 6] = [
    "slack_bot_token",
    "trello_credentials",
    "gemini_api_key",
    "groq_api_key",
    "google_client_secret",
    "google_credential",
];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(LoadOptions::default());
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_NOT_READY };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

pub fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_token(&config));
            checks.push(check_trello(&config));
            checks.push(check_llm("gemini_api_key", "GEMINI_API_KEY", &config.gemini));
            checks.push(check_llm("groq_api_key", "GROQ_API_KEY", &config.groq));
            checks.push(check_client_secret(&config));
            checks.push(check_google_credential(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_token(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "slack_bot_token",
        status: CheckStatus::Pass,
        details: format!(
            "bot token `{}` has the expected format",
            redact_token(config.slack.bot_token.expose_secret())
        ),
    }
}

fn check_trello(config: &AppConfig) -> DoctorCheck {
    if config.trello.has_credentials() {
        DoctorCheck {
            name: "trello_credentials",
            status: CheckStatus::Pass,
            details: format!(
                "api key and token present; cards go to `{}` on `{}`",
                config.trello.list_name, config.trello.board_name
            ),
        }
    } else {
        DoctorCheck {
            name: "trello_credentials",
            status: CheckStatus::Fail,
            details: "set TRELLO_API_KEY and TRELLO_TOKEN to enable Trello commands".to_string(),
        }
    }
}

fn check_llm(name: &'static str, env_key: &str, llm: &LlmConfig) -> DoctorCheck {
    if llm.has_api_key() {
        DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("api key present for model `{}`", llm.model),
        }
    } else {
        DoctorCheck { name, status: CheckStatus::Fail, details: format!("{env_key} is not set") }
    }
}

fn check_client_secret(config: &AppConfig) -> DoctorCheck {
    let path = &config.google.client_secret_path;
    let parsed = fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))
        .and_then(|raw| ClientSecrets::from_json(&raw).map_err(|error| error.to_string()));

    match parsed {
        Ok(secrets) => DoctorCheck {
            name: "google_client_secret",
            status: CheckStatus::Pass,
            details: format!("client `{}` loaded from `{}`", secrets.client_id, path.display()),
        },
        Err(details) => {
            DoctorCheck { name: "google_client_secret", status: CheckStatus::Fail, details }
        }
    }
}

fn check_google_credential(config: &AppConfig) -> DoctorCheck {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "google_credential",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let path = &config.google.token_cache_path;
    let cached = runtime.block_on(TokenCache::new(path).load());
    google_credential_check(cached, path, Utc::now())
}

fn google_credential_check(
    cached: Result<Option<StoredCredential>, BridgeError>,
    path: &Path,
    now: DateTime<Utc>,
) -> DoctorCheck {
    let (status, details) = match cached {
        Ok(Some(credential)) if credential.is_valid_at(now) => {
            (CheckStatus::Pass, "cached credential is valid".to_string())
        }
        Ok(Some(credential)) if credential.refresh_token.is_some() => (
            CheckStatus::Pass,
            "cached credential expired; it is refreshed on first use".to_string(),
        ),
        Ok(Some(_)) => (
            CheckStatus::Fail,
            format!(
                "cached credential at `{}` expired without a refresh token; \
                 run `slackbridge authorize`",
                path.display()
            ),
        ),
        Ok(None) => (
            CheckStatus::Fail,
            format!(
                "{} at `{}`; run `slackbridge authorize`",
                CredentialState::AwaitingInteractiveAuthorization.as_str(),
                path.display()
            ),
        ),
        Err(error) => (CheckStatus::Fail, error.to_string()),
    };

    DoctorCheck { name: "google_credential", status, details }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
