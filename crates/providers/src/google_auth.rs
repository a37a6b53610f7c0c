//! Google OAuth 2.0 credential management shared by the Gmail and Calendar clients.
//!
//! The credential lives in a JSON token cache on disk. Serving code only ever
//! reads or refreshes it; obtaining a brand-new credential requires the
//! operator-driven consent flow exposed through [`GoogleAuthManager::authorization_request`]
//! and [`GoogleAuthManager::complete_authorization`].

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackbridge_core::BridgeError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http;

/// Scopes needed to read the inbox and create calendar events.
pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/calendar.events",
];

const PROVIDER: &str = "google-oauth";
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialState {
    Unloaded,
    CachedValid,
    CachedExpired,
    AwaitingInteractiveAuthorization,
}

impl CredentialState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::CachedValid => "cached_valid",
            Self::CachedExpired => "cached_expired",
            Self::AwaitingInteractiveAuthorization => "awaiting_interactive_authorization",
        }
    }
}

/// OAuth client identity from a Google "installed app" (or "web") client-secret file.
#[derive(Clone, Debug)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsEntry>,
    web: Option<ClientSecretsEntry>,
}

#[derive(Deserialize)]
struct ClientSecretsEntry {
    client_id: String,
    client_secret: String,
}

impl ClientSecrets {
    pub async fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
            BridgeError::Auth(format!(
                "could not read google client secrets `{}`: {error}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        let file: ClientSecretsFile = serde_json::from_str(raw).map_err(|error| {
            BridgeError::parse(format!("google client secrets are malformed: {error}"))
        })?;
        let entry = file.installed.or(file.web).ok_or_else(|| {
            BridgeError::parse("google client secrets need an `installed` or `web` section")
        })?;

        Ok(Self { client_id: entry.client_id, client_secret: entry.client_secret.into() })
    }
}

/// Credential record persisted in the token cache file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredCredential {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => true,
        }
    }

    fn from_token_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            // Google omits the refresh token on refresh grants; keep the one we had.
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at: response.expires_in.map(|seconds| now + Duration::seconds(seconds)),
            scopes: response
                .scope
                .map(|scope| scope.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_else(|| GOOGLE_SCOPES.iter().map(|scope| scope.to_string()).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<StoredCredential>, BridgeError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(BridgeError::Auth(format!(
                    "could not read token cache `{}`: {error}",
                    self.path.display()
                )))
            }
        };

        serde_json::from_str(&raw).map(Some).map_err(|error| {
            BridgeError::parse(format!(
                "token cache `{}` is malformed: {error}",
                self.path.display()
            ))
        })
    }

    /// Writes through a sibling temp file so a crash never leaves a half-written cache.
    pub async fn save(&self, credential: &StoredCredential) -> Result<(), BridgeError> {
        let serialized = serde_json::to_string_pretty(credential)
            .map_err(|error| BridgeError::parse(format!("could not encode credential: {error}")))?;
        let staging = self.path.with_extension("json.tmp");
        let io_error = |error: std::io::Error| {
            BridgeError::Auth(format!(
                "could not write token cache `{}`: {error}",
                self.path.display()
            ))
        };

        tokio::fs::write(&staging, serialized).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(io_error)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub redirect_uri: String,
}

struct AuthInner {
    credential: Option<StoredCredential>,
}

pub struct GoogleAuthManager {
    http: Client,
    cache: TokenCache,
    client_secrets_path: PathBuf,
    auth_url: String,
    token_url: String,
    inner: Mutex<AuthInner>,
    // Readable while a refresh holds `inner`.
    state: RwLock<CredentialState>,
}

impl GoogleAuthManager {
    pub fn new(
        http: Client,
        cache: TokenCache,
        client_secrets_path: impl Into<PathBuf>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            cache,
            client_secrets_path: client_secrets_path.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            inner: Mutex::new(AuthInner { credential: None }),
            state: RwLock::new(CredentialState::Unloaded),
        }
    }

    /// Last observed credential state; never waits on an in-flight refresh.
    pub fn state(&self) -> CredentialState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: CredentialState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Reads the persisted credential, usually once at startup.
    pub async fn load(&self) -> Result<CredentialState, BridgeError> {
        let mut inner = self.inner.lock().await;
        self.load_locked(&mut inner).await
    }

    async fn load_locked(&self, inner: &mut AuthInner) -> Result<CredentialState, BridgeError> {
        let credential = self.cache.load().await?;
        let state = match &credential {
            Some(credential) if credential.is_valid_at(Utc::now()) => CredentialState::CachedValid,
            Some(_) => CredentialState::CachedExpired,
            None => CredentialState::AwaitingInteractiveAuthorization,
        };
        inner.credential = credential;
        self.set_state(state);

        info!(
            event_name = "auth.google.cache_loaded",
            state = state.as_str(),
            path = %self.cache.path().display(),
            "google token cache loaded"
        );
        Ok(state)
    }

    /// Returns a usable access token, refreshing an expired one at most once at a time.
    ///
    /// Never starts the interactive consent flow; a missing or unrefreshable
    /// credential surfaces as `BridgeError::Auth`.
    pub async fn access_token(&self) -> Result<String, BridgeError> {
        let mut inner = self.inner.lock().await;

        let held_is_valid =
            inner.credential.as_ref().is_some_and(|credential| credential.is_valid_at(Utc::now()));
        if !held_is_valid {
            // `slackbridge authorize` may have rewritten the cache since the last look.
            self.load_locked(&mut inner).await?;
        }

        let Some(credential) = inner.credential.clone() else {
            self.set_state(CredentialState::AwaitingInteractiveAuthorization);
            return Err(authorization_required("no stored google credential"));
        };

        if credential.is_valid_at(Utc::now()) {
            self.set_state(CredentialState::CachedValid);
            return Ok(credential.access_token);
        }

        self.set_state(CredentialState::CachedExpired);
        let Some(refresh_token) = credential.refresh_token.clone() else {
            self.set_state(CredentialState::AwaitingInteractiveAuthorization);
            return Err(authorization_required("google credential expired without a refresh token"));
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.cache.save(&refreshed).await?;
                inner.credential = Some(refreshed.clone());
                self.set_state(CredentialState::CachedValid);
                info!(event_name = "auth.google.refreshed", "google access token refreshed");
                Ok(refreshed.access_token)
            }
            Err(error) => {
                warn!(
                    event_name = "auth.google.refresh_failed",
                    error = %error,
                    "google token refresh failed"
                );
                self.set_state(CredentialState::AwaitingInteractiveAuthorization);
                Err(authorization_required(&format!("token refresh failed ({error})")))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredential, BridgeError> {
        debug!("refreshing google oauth token");
        let secrets = ClientSecrets::from_file(&self.client_secrets_path).await?;
        let request = self.http.post(&self.token_url).form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.expose_secret()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]);
        let response = http::send(PROVIDER, request).await?;
        let token: TokenResponse = http::read_json(PROVIDER, response).await?;

        Ok(StoredCredential::from_token_response(token, Some(refresh_token.to_owned()), Utc::now()))
    }

    pub async fn client_secrets(&self) -> Result<ClientSecrets, BridgeError> {
        ClientSecrets::from_file(&self.client_secrets_path).await
    }

    /// Builds the consent URL the operator opens in a browser.
    pub fn authorization_request(
        &self,
        secrets: &ClientSecrets,
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, BridgeError> {
        let state = Uuid::new_v4().simple().to_string();
        let scope = GOOGLE_SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|error| BridgeError::Auth(format!("invalid google auth url: {error}")))?;

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state,
            redirect_uri: redirect_uri.to_owned(),
        })
    }

    /// Exchanges the authorization code from the consent redirect and persists the result.
    pub async fn complete_authorization(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<StoredCredential, BridgeError> {
        let request = self.http.post(&self.token_url).form(&[
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ]);
        let response = http::send(PROVIDER, request).await?;
        let token: TokenResponse = http::read_json(PROVIDER, response).await?;
        let credential = StoredCredential::from_token_response(token, None, Utc::now());

        let mut inner = self.inner.lock().await;
        self.cache.save(&credential).await?;
        inner.credential = Some(credential.clone());
        self.set_state(CredentialState::CachedValid);
        info!(
            event_name = "auth.google.authorized",
            path = %self.cache.path().display(),
            "google credential stored"
        );

        Ok(credential)
    }
}

fn authorization_required(reason: &str) -> BridgeError {
    BridgeError::Auth(format!(
        "{reason}; an operator must run `slackbridge authorize` to grant Google access"
    ))
}
