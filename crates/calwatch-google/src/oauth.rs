//! OAuth access tokens for the Google Calendar API.
//!
//! The token file is the authorized-user JSON written by Google's installed-app
//! flow (`token`, `refresh_token`, `client_id`, `client_secret`, `token_uri`,
//! `expiry`). Only the refresh leg lives here: the file must already exist.
//!
//! Before each request the cached token is checked; if it is missing or expires
//! within 60 s it is refreshed against `token_uri` and the file is rewritten.

use std::path::{Path, PathBuf};

use calwatch_core::SourceError;
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Contents of the token file. Unknown fields (`scopes`, `account`, ...) are
/// kept so rewriting the file does not drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUser {
    /// Parsed `expiry`. Accepts RFC 3339 and the offset-less form, read as UTC.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    fn access_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the access token must be refreshed before use at `now`.
    ///
    /// A token with no known expiry is refreshed when a refresh token is
    /// available and used as-is otherwise.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token().is_none() {
            return true;
        }
        match self.expires_at() {
            Some(expiry) => expiry - Duration::seconds(REFRESH_MARGIN_SECS) <= now,
            None => self.has_refresh_token(),
        }
    }

    fn apply(&mut self, resp: TokenResponse, now: DateTime<Utc>) {
        let lifetime = resp.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.token = Some(resp.access_token);
        if let Some(refresh_token) = resp.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.expiry = Some(
            (now + Duration::seconds(lifetime)).to_rfc3339_opts(SecondsFormat::Micros, true),
        );
    }
}

/// OAuth client registration from the credentials file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

/// Read the `installed` (or else `web`) section of a client secrets file.
pub fn read_client_secrets(path: &Path) -> Result<ClientSecrets, SourceError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        SourceError::Auth(format!("cannot read credentials file {}: {e}", path.display()))
    })?;
    let file: ClientSecretsFile = serde_json::from_str(&data).map_err(|e| {
        SourceError::Auth(format!("invalid credentials file {}: {e}", path.display()))
    })?;
    file.installed.or(file.web).ok_or_else(|| {
        SourceError::Auth(format!(
            "credentials file {} has neither an \"installed\" nor a \"web\" client",
            path.display()
        ))
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Hands out access tokens, refreshing and persisting them as needed.
pub struct GoogleAuth {
    client: reqwest::Client,
    credentials_path: PathBuf,
    token_path: PathBuf,
    cached: RwLock<Option<AuthorizedUser>>,
}

impl GoogleAuth {
    pub fn new(
        client: reqwest::Client,
        credentials_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
            cached: RwLock::new(None),
        }
    }

    /// A usable access token.
    pub async fn access_token(&self) -> Result<String, SourceError> {
        // Fast path: read lock
        {
            let cached = self.cached.read().await;
            if let Some(user) = cached.as_ref().filter(|u| !u.needs_refresh(Utc::now())) {
                if let Some(token) = user.access_token() {
                    return Ok(token.to_string());
                }
            }
        }

        // Slow path: write lock, load and refresh
        let mut cached = self.cached.write().await;
        let mut user = match cached.take() {
            Some(user) => user,
            None => self.read_token_file()?,
        };

        if user.needs_refresh(Utc::now()) {
            info!(path = %self.token_path.display(), "refreshing Google access token");
            self.refresh(&mut user).await?;
            self.persist(&user);
        }

        let token = user
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| SourceError::Auth("token file has no access token".into()))?;
        *cached = Some(user);
        Ok(token)
    }

    fn read_token_file(&self) -> Result<AuthorizedUser, SourceError> {
        let data = match std::fs::read_to_string(&self.token_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::Auth(format!(
                    "no OAuth token at {}; complete Google's consent flow once to create it",
                    self.token_path.display()
                )));
            }
            Err(e) => {
                return Err(SourceError::Auth(format!(
                    "cannot read token file {}: {e}",
                    self.token_path.display()
                )));
            }
        };
        serde_json::from_str(&data).map_err(|e| {
            SourceError::Auth(format!(
                "invalid token file {}: {e}",
                self.token_path.display()
            ))
        })
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), SourceError> {
        let refresh_token = user
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SourceError::Auth(format!(
                    "access token expired and {} has no refresh_token; repeat the consent flow",
                    self.token_path.display()
                ))
            })?;

        let (client_id, client_secret, file_token_uri) =
            match (user.client_id.clone(), user.client_secret.clone()) {
                (Some(id), Some(secret)) => (id, secret, None),
                _ => {
                    let secrets = read_client_secrets(&self.credentials_path)?;
                    (secrets.client_id, secrets.client_secret, secrets.token_uri)
                }
            };
        let token_uri = user
            .token_uri
            .clone()
            .or(file_token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let resp = self
            .client
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Request(format!("token refresh: {e}")))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Google token refresh rejected");
            return Err(match status {
                400 | 401 => SourceError::Auth(format!("token refresh rejected ({status}): {text}")),
                _ => SourceError::Api {
                    status,
                    message: format!("token refresh failed: {text}"),
                },
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("token response: {e}")))?;
        debug!(expires_in = body.expires_in, "Google token refreshed");
        user.apply(body, Utc::now());
        Ok(())
    }

    fn persist(&self, user: &AuthorizedUser) {
        match serde_json::to_string_pretty(user) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.token_path, json) {
                    warn!(
                        path = %self.token_path.display(),
                        error = %e,
                        "failed to save refreshed Google token"
                    );
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize refreshed Google token"),
        }
    }
}
