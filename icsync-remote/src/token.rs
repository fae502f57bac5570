//! OAuth token value and its on-disk store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, RemoteResult};

/// Tokens expiring within this window are treated as already expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(with = "expiry_format")]
    pub expiry: DateTime<Utc>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Token {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expiry,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry > now + Duration::seconds(EXPIRY_LEEWAY_SECS)
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn token_type(&self) -> &str {
        if self.token_type.trim().is_empty() {
            DEFAULT_TOKEN_TYPE
        } else {
            &self.token_type
        }
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type(), self.access_token)
    }
}

/// Expiry is stored as UTC RFC3339 with as much sub-second precision as it carries.
mod expiry_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(expiry: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// JSON token file with owner-only permissions.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when no token has been saved yet.
    pub fn load(&self) -> RemoteResult<Option<Token>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| RemoteError::persistence(&self.path, e))?;
        let token: Token = serde_json::from_str(&contents)?;

        Ok(Some(token))
    }

    pub fn save(&self, token: &Token) -> RemoteResult<()> {
        let contents = serde_json::to_string_pretty(token)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RemoteError::persistence(parent, e))?;
        }

        std::fs::write(&self.path, contents)
            .map_err(|e| RemoteError::persistence(&self.path, e))?;

        // Owner-only (0600), the file holds OAuth tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| RemoteError::persistence(&self.path, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token_expiring_in(now: DateTime<Utc>, seconds: i64) -> Token {
        Token::new("access", "refresh", now + Duration::seconds(seconds))
    }

    #[test]
    fn test_validity_leeway() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        assert!(!token_expiring_in(now, 29).is_valid_at(now));
        assert!(!token_expiring_in(now, 30).is_valid_at(now));
        assert!(token_expiring_in(now, 31).is_valid_at(now));
    }

    #[test]
    fn test_empty_access_token_is_invalid() {
        let now = Utc::now();
        let token = Token::new("", "refresh", now + Duration::hours(1));
        assert!(!token.is_valid_at(now));
    }

    #[test]
    fn test_blank_token_type_defaults_to_bearer() {
        let mut token = Token::new("abc", "", Utc::now());
        token.token_type = String::new();
        assert_eq!(token.authorization_header(), "Bearer abc");

        token.token_type = "MAC".into();
        assert_eq!(token.authorization_header(), "MAC abc");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        assert!(store.load().unwrap().is_none());

        let expiry = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let token = Token::new("access", "refresh", expiry);
        store.save(&token).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"expiry\": \"2025-03-01T12:00:00.123456789Z\""), "{}", raw);
        assert!(raw.contains('\n'), "token file should be indented");
        assert_eq!(store.load().unwrap(), Some(token));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_accepts_missing_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"abc","expiry":"2030-01-01T00:00:00+02:00"}"#,
        )
        .unwrap();

        let token = TokenStore::new(&path).load().unwrap().unwrap();
        assert_eq!(token.refresh_token, "");
        assert_eq!(token.token_type(), "Bearer");
        assert_eq!(token.expiry, Utc.with_ymd_and_hms(2029, 12, 31, 22, 0, 0).unwrap());
    }
}
