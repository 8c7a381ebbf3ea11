//! Access token issued by the order server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::email::Email;

/// An opaque session credential issued on login or signup.
///
/// Persisted client-side and presented as a bearer credential when the
/// session is restored. Deleted on logout, account deletion, or when the
/// server rejects it (expired / not found).
///
/// Implements `Debug` manually to redact the token id.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    /// Email of the account the token belongs to.
    pub email: Email,
    /// Opaque token id, sent as the bearer credential.
    pub id: String,
    /// When the server will stop honoring the token.
    #[serde(rename = "expirationDate")]
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token's own expiration date has passed.
    ///
    /// The server remains the authority; this is only a fast local check to
    /// skip a lookup that is guaranteed to 401.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("email", &self.email)
            .field("id", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expires_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            email: Email::parse("diner@example.com").unwrap(),
            id: "tok_5f2d9c".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_is_expired() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(token(now - chrono::Duration::hours(1)).is_expired(now));
        assert!(token(now).is_expired(now));
        assert!(!token(now + chrono::Duration::hours(1)).is_expired(now));
    }

    #[test]
    fn test_debug_redacts_id() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let debug_output = format!("{:?}", token(now));

        assert!(debug_output.contains("diner@example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_5f2d9c"));
    }

    #[test]
    fn test_serde_uses_server_field_name() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_string(&token(now)).unwrap();
        assert!(json.contains("\"expirationDate\""));

        let parsed: AccessToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token(now));
    }
}
