use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use slackbridge_providers::CredentialState;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub google: HealthCheck,
    pub available_task_permits: usize,
    pub checked_at: String,
}

/// Always 200; a missing Google credential only degrades the report.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let google = google_check(state.google_auth.state());
    let ready = google.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "slackbridge-server accepting commands".to_string(),
        },
        google,
        available_task_permits: state.dispatcher.runner().available_permits(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

fn google_check(state: CredentialState) -> HealthCheck {
    let status = match state {
        CredentialState::CachedValid | CredentialState::CachedExpired => "ready",
        CredentialState::Unloaded | CredentialState::AwaitingInteractiveAuthorization => {
            "degraded"
        }
    };
    HealthCheck { status, detail: state.as_str().to_string() }
}
