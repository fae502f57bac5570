#![allow(dead_code)]

use chrono::{Duration, Utc};
use icsync_remote::{AuthClient, QuietPrompt, RemoteConfig, Token, TokenStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestEnv {
    pub server: MockServer,
    pub dir: TempDir,
}

impl TestEnv {
    pub async fn start() -> Self {
        TestEnv {
            server: MockServer::start().await,
            dir: tempfile::tempdir().expect("Should create temp dir"),
        }
    }

    pub fn store(&self) -> TokenStore {
        TokenStore::new(self.dir.path().join("icsync").join("token.json"))
    }

    pub fn client(&self) -> AuthClient {
        let config = RemoteConfig::new("test-client", self.server.uri());
        AuthClient::with_store(config, self.store())
            .expect("Should build client")
            .with_prompt(QuietPrompt)
    }

    pub fn save_token(&self, token: &Token) {
        self.store().save(token).expect("Should save token");
    }

    pub async fn mount_device_code(&self, expires_in: u64, interval: u64) {
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .and(body_string_contains("client_id=test-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "device-123",
                "user_code": "ABCD-EFGH",
                "verification_url": format!("{}/activate", self.server.uri()),
                "expires_in": expires_in,
                "interval": interval,
            })))
            .mount(&self.server)
            .await;
    }

    /// Device-code polls answered with `authorization_pending`, at most `times` times.
    pub async fn mount_pending(&self, times: Option<u64>) {
        let mock = Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=device-123"))
            .respond_with(pending());

        match times {
            Some(n) => mock.up_to_n_times(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    pub async fn mount_device_token(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=device-123"))
            .respond_with(token_response(access_token, "refresh-from-device", 3600))
            .mount(&self.server)
            .await;
    }

    pub async fn requests_to(&self, endpoint: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == endpoint)
            .collect()
    }
}

pub fn pending() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": "authorization_pending",
        "error_description": "The user has not yet approved the device",
    }))
}

pub fn token_response(access_token: &str, refresh_token: &str, expires_in: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    }))
}

pub fn valid_token(access_token: &str) -> Token {
    Token::new(access_token, "refresh-1", Utc::now() + Duration::hours(1))
}

pub fn expired_token(access_token: &str, refresh_token: &str) -> Token {
    Token::new(access_token, refresh_token, Utc::now() - Duration::minutes(5))
}
