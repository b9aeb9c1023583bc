use chrono::{DateTime, Utc};

/// Answer to a device-code request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until `device_code` stops being accepted.
    pub expires_in: u64,
    /// Minimum seconds between token polls.
    pub interval: u64,
}

/// A token handed out by the token endpoint, before its expiry is anchored to a clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// An access token together with its absolute expiry, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Tokens without a recorded expiry are treated as long-lived personal tokens.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
