//! Keeps a valid access token around.
//!
//! `ensure_token` walks a fallback chain, stopping at the first step that
//! yields a valid token:
//!
//! 1. the in-memory token, if it is still valid
//! 2. a refresh of the in-memory token
//! 3. the token file on disk (another process may have refreshed it)
//! 4. a refresh of the token loaded from disk
//! 5. the OAuth device authorization flow
//!
//! Every token obtained from the network is persisted before it is returned.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::token::{Token, TokenStore};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEVICE_CODE_LIFETIME_SECS: u64 = 1800;
/// Lifetime assumed when a fresh token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// What the operator needs to approve a device.
#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    pub verification_url: String,
    pub user_code: String,
    pub expires_in: Duration,
}

/// Shows the verification URL and user code to whoever can approve them.
pub trait DevicePrompt: Send + Sync {
    fn show(&self, authorization: &DeviceAuthorization);
}

/// Prints to stderr and tries to open the browser.
pub struct TerminalPrompt;

impl DevicePrompt for TerminalPrompt {
    fn show(&self, authorization: &DeviceAuthorization) {
        eprintln!("\nOpen this URL in your browser to authorize icsync:\n");
        eprintln!("  {}\n", authorization.verification_url);
        eprintln!("and enter the code: {}\n", authorization.user_code);

        if open::that(&authorization.verification_url).is_err() {
            eprintln!("(Could not open browser automatically, please copy the URL above)");
        }
    }
}

/// Only logs. Used when nobody is watching the terminal.
pub struct QuietPrompt;

impl DevicePrompt for QuietPrompt {
    fn show(&self, authorization: &DeviceAuthorization) {
        info!(
            url = %authorization.verification_url,
            "Device authorization required"
        );
    }
}

#[derive(Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    interval: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: i64,
}

impl TokenResponse {
    /// Missing fields fall back to `previous` where there is one.
    fn into_token(self, previous: Option<&Token>, now: DateTime<Utc>) -> RemoteResult<Token> {
        if self.access_token.is_empty() {
            return Err(RemoteError::MissingAccessToken);
        }

        let refresh_token = match (self.refresh_token.is_empty(), previous) {
            (true, Some(previous)) => previous.refresh_token.clone(),
            _ => self.refresh_token,
        };

        let expiry = match previous {
            _ if self.expires_in > 0 => now + chrono::Duration::seconds(self.expires_in),
            Some(previous) => previous.expiry,
            None => now + chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        };

        let mut token = Token::new(self.access_token, refresh_token, expiry);
        if !self.token_type.is_empty() {
            token.token_type = self.token_type;
        }
        Ok(token)
    }
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

enum PollOutcome {
    Pending,
    Authorized(Token),
}

pub struct AuthClient {
    http: reqwest::Client,
    config: RemoteConfig,
    store: TokenStore,
    token: Mutex<Option<Token>>,
    prompt: Box<dyn DevicePrompt>,
}

impl AuthClient {
    /// Builds a client whose token lives at `config.token_file()`.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let store = TokenStore::new(config.token_file()?);
        Self::with_store(config, store)
    }

    pub fn with_store(config: RemoteConfig, store: TokenStore) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(AuthClient {
            http,
            config,
            store,
            token: Mutex::new(None),
            prompt: Box::new(TerminalPrompt),
        })
    }

    pub fn with_prompt(mut self, prompt: impl DevicePrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns a valid token, refreshing or re-authorizing as needed.
    ///
    /// Concurrent callers wait for each other: the token lock is held for the
    /// whole chain, network calls included.
    pub async fn ensure_token(&self, cancel: &CancellationToken) -> RemoteResult<Token> {
        let mut slot = self.token.lock().await;

        if let Some(current) = slot.clone() {
            if current.is_valid() {
                return Ok(current);
            }
            if current.has_refresh_token() {
                match self.refresh(&current, cancel).await {
                    Ok(token) => return self.accept(&mut slot, token),
                    Err(RemoteError::Cancelled) => return Err(RemoteError::Cancelled),
                    Err(e) => warn!(error = %e, "Refreshing the in-memory token failed"),
                }
            }
        }

        match self.store.load() {
            Ok(Some(stored)) if stored.is_valid() => {
                debug!(path = %self.store.path().display(), "Using token from disk");
                *slot = Some(stored.clone());
                return Ok(stored);
            }
            Ok(Some(stored)) if stored.has_refresh_token() => {
                match self.refresh(&stored, cancel).await {
                    Ok(token) => return self.accept(&mut slot, token),
                    Err(RemoteError::Cancelled) => return Err(RemoteError::Cancelled),
                    Err(e) => warn!(error = %e, "Refreshing the stored token failed"),
                }
            }
            Ok(Some(_)) => debug!("Stored token is expired and has no refresh token"),
            Ok(None) => debug!(path = %self.store.path().display(), "No stored token"),
            Err(e) => warn!(error = %e, "Ignoring unreadable token file"),
        }

        let token = self.device_flow(cancel).await?;
        self.accept(&mut slot, token)
    }

    fn accept(&self, slot: &mut Option<Token>, token: Token) -> RemoteResult<Token> {
        self.store.save(&token)?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn refresh(&self, token: &Token, cancel: &CancellationToken) -> RemoteResult<Token> {
        debug!("Refreshing access token");

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ];
        self.push_client_credentials(&mut form);

        let (status, body) = self.post_form(&self.config.token_url(), &form, cancel).await?;
        if !status.is_success() {
            return Err(RemoteError::Http { status, body });
        }

        let response: TokenResponse = serde_json::from_str(&body)?;
        let token = response.into_token(Some(token), Utc::now())?;
        info!("Refreshed access token");
        Ok(token)
    }

    async fn device_flow(&self, cancel: &CancellationToken) -> RemoteResult<Token> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let (status, body) = self
            .post_form(&self.config.device_code_url(), &form, cancel)
            .await?;
        if !status.is_success() {
            return Err(RemoteError::Http { status, body });
        }

        let device: DeviceCodeResponse = serde_json::from_str(&body)?;
        let interval = Duration::from_secs(non_zero_or(device.interval, DEFAULT_POLL_INTERVAL_SECS));
        let lifetime = Duration::from_secs(non_zero_or(
            device.expires_in,
            DEFAULT_DEVICE_CODE_LIFETIME_SECS,
        ));
        let deadline = Instant::now() + lifetime;

        self.prompt.show(&DeviceAuthorization {
            verification_url: device.verification_url,
            user_code: device.user_code,
            expires_in: lifetime,
        });

        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }
            if Instant::now() >= deadline {
                return Err(RemoteError::DeviceCodeExpired);
            }

            attempts += 1;
            debug!(attempt = attempts, "Polling for device authorization");

            match self.poll_device_token(&device.device_code, cancel).await? {
                PollOutcome::Authorized(token) => {
                    info!(attempts, "Device authorized");
                    return Ok(token);
                }
                PollOutcome::Pending => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
            }
        }
    }

    async fn poll_device_token(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> RemoteResult<PollOutcome> {
        let mut form = vec![("grant_type", DEVICE_CODE_GRANT), ("device_code", device_code)];
        self.push_client_credentials(&mut form);

        let (status, body) = self.post_form(&self.config.token_url(), &form, cancel).await?;

        if status.is_success() {
            let response: TokenResponse = serde_json::from_str(&body)?;
            return Ok(PollOutcome::Authorized(response.into_token(None, Utc::now())?));
        }

        if status != StatusCode::BAD_REQUEST {
            return Err(RemoteError::Http { status, body });
        }

        match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(error) if error.error == "authorization_pending" => Ok(PollOutcome::Pending),
            Ok(error) => Err(RemoteError::Authorization {
                error: error.error,
                description: error.error_description,
            }),
            Err(_) => Err(RemoteError::Http { status, body }),
        }
    }

    fn push_client_credentials<'a>(&'a self, form: &mut Vec<(&'a str, &'a str)>) {
        form.push(("client_id", self.config.client_id.as_str()));
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
    }

    /// Posts a form and returns the status with the raw body.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> RemoteResult<(StatusCode, String)> {
        let request = async {
            let response = self.http.post(url).form(form).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, RemoteError>((status, body))
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(RemoteError::Cancelled),
            result = request => result,
        }
    }
}

fn non_zero_or(value: u64, default: u64) -> u64 {
    if value == 0 { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn response(json: &str) -> TokenResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let result = response(r#"{"refresh_token":"r"}"#).into_token(None, now());
        assert!(matches!(result, Err(RemoteError::MissingAccessToken)));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let previous = Token::new("old", "keep-me", now());
        let token = response(r#"{"access_token":"new","expires_in":600}"#)
            .into_token(Some(&previous), now())
            .unwrap();

        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token, "keep-me");
        assert_eq!(token.expiry, now() + chrono::Duration::seconds(600));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_refresh_without_expires_in_reuses_previous_expiry() {
        let previous_expiry = now() - chrono::Duration::minutes(5);
        let previous = Token::new("old", "r", previous_expiry);

        let token = response(r#"{"access_token":"new","expires_in":0}"#)
            .into_token(Some(&previous), now())
            .unwrap();
        assert_eq!(token.expiry, previous_expiry);
    }

    #[test]
    fn test_fresh_token_without_expires_in_gets_default_lifetime() {
        let token = response(r#"{"access_token":"a","token_type":"bearer"}"#)
            .into_token(None, now())
            .unwrap();

        assert_eq!(token.expiry, now() + chrono::Duration::hours(1));
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.refresh_token, "");
    }

    #[test]
    fn test_device_response_accepts_verification_uri() {
        let device: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD-EFGH","verification_uri":"https://example.com/device"}"#,
        )
        .unwrap();

        assert_eq!(device.verification_url, "https://example.com/device");
        assert_eq!(device.interval, 0);
        assert_eq!(non_zero_or(device.interval, DEFAULT_POLL_INTERVAL_SECS), 5);
    }
}
