//! Interactive Google consent flow.
//!
//! Binds a loopback listener, prints the consent URL, waits for Google to redirect the
//! operator's browser back with an authorization code, then exchanges and stores it in the
//! token cache the server reads from.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use slackbridge_core::config::{AppConfig, LoadOptions};
use slackbridge_providers::{
    build_client, AuthorizationRequest, GoogleAuthManager, StoredCredential, TokenCache,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::{runtime, CommandResult, EXIT_AUTHORIZATION, EXIT_CONFIG};

const COMMAND: &str = "authorize";

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub fn run(port: u16, timeout_secs: u64) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_AUTHORIZATION,
            )
        }
    };

    let result = runtime.block_on(async {
        let http = build_client(Duration::from_secs(config.server.http_timeout_secs))?;
        let google = &config.google;
        let manager = GoogleAuthManager::new(
            http,
            TokenCache::new(&google.token_cache_path),
            &google.client_secret_path,
            &google.auth_url,
            &google.token_url,
        );
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("could not bind loopback listener on port {port}"))?;

        let credential =
            authorize_with(&manager, listener, Duration::from_secs(timeout_secs), |request| {
                println!("Open this URL in a browser to grant Google access:\n\n{}\n", request.url);
                println!("Waiting for the redirect on {} ...", request.redirect_uri);
            })
            .await?;
        Ok::<_, anyhow::Error>(credential)
    });

    match result {
        Ok(_) => CommandResult::success(
            COMMAND,
            format!("google credential stored at `{}`", config.google.token_cache_path.display()),
        ),
        Err(error) => CommandResult::failure(
            COMMAND,
            "authorization",
            format!("{error:#}"),
            EXIT_AUTHORIZATION,
        ),
    }
}

/// Runs the consent flow against an already-bound loopback listener.
///
/// `announce` receives the consent request once the listener is ready for the redirect.
pub async fn authorize_with(
    manager: &GoogleAuthManager,
    listener: TcpListener,
    timeout: Duration,
    announce: impl FnOnce(&AuthorizationRequest),
) -> Result<StoredCredential> {
    let secrets = manager.client_secrets().await?;
    let address = listener.local_addr().context("loopback listener has no local address")?;
    let redirect_uri = format!("http://127.0.0.1:{}/", address.port());
    let request = manager.authorization_request(&secrets, &redirect_uri)?;

    let (callback_tx, callback_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let sender: CallbackSender = Arc::new(Mutex::new(Some(callback_tx)));
    let app = Router::new().route("/", get(receive_callback)).with_state(sender);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    announce(&request);

    let received = tokio::time::timeout(timeout, callback_rx).await;
    let _ = stop_tx.send(());
    let _ = server.await;

    let params = received
        .map_err(|_| {
            anyhow!("timed out after {}s waiting for the consent redirect", timeout.as_secs())
        })?
        .context("consent listener stopped before a redirect arrived")?;
    let code = validate_callback(&request, params)?;

    let credential = manager.complete_authorization(&secrets, &code, &request.redirect_uri).await?;
    Ok(credential)
}

async fn receive_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> &'static str {
    let sender = sender.lock().ok().and_then(|mut slot| slot.take());
    match sender {
        Some(sender) => {
            let _ = sender.send(params);
            "Slackbridge received the Google authorization. You can close this tab."
        }
        None => "Authorization was already received.",
    }
}

fn validate_callback(request: &AuthorizationRequest, params: CallbackParams) -> Result<String> {
    if let Some(error) = params.error {
        bail!("google consent was denied: {error}");
    }
    if params.state.as_deref() != Some(request.state.as_str()) {
        bail!("consent redirect carried an unexpected state parameter");
    }
    match params.code {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => bail!("consent redirect did not include an authorization code"),
    }
}
