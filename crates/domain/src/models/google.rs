//! Per-user access token for the external provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Key under which a user's token is cached.
pub fn token_cache_key(user_id: i64) -> String {
    format!("google_token_{}", user_id)
}

/// Bearer token stored for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl GoogleToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| exp <= now)
    }
}

/// Request payload for storing a token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct StoreTokenRequest {
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
    /// Lifetime in seconds from now.
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cache_key() {
        assert_eq!(token_cache_key(42), "google_token_42");
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let token = GoogleToken {
            access_token: "t".into(),
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(token.is_expired(now));

        let token = GoogleToken {
            access_token: "t".into(),
            expires_at: None,
        };
        assert!(!token.is_expired(now));
    }
}
