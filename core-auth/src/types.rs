use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use crate::oauth::TokenGrant;

/// Authorization material permitting API access on behalf of a user.
///
/// A credential is *valid* when its expiry lies in the future and its granted
/// scopes cover the required set; an expired credential with a non-empty
/// refresh token is *refreshable*. Refresh mutates the credential in place
/// and preserves the refresh token when the grant omits one.
///
/// # Security
///
/// Token values are never logged; the `Debug` implementation redacts them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The access token sent as a bearer credential on every API request
    pub access_token: String,
    /// The long-lived token used to obtain new access tokens, if granted
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
    /// OAuth scopes this credential was granted
    pub scopes: BTreeSet<String>,
}

impl Credential {
    /// Create a credential expiring `expires_in` seconds from now.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        scopes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
            scopes: scopes.into_iter().collect(),
        }
    }

    /// Build a credential from a token grant, falling back to the requested
    /// scopes when the endpoint did not echo a scope list.
    pub fn from_grant(grant: TokenGrant, requested_scopes: &[String]) -> Self {
        let scopes = match grant.scope.as_deref() {
            Some(granted) if !granted.trim().is_empty() => {
                granted.split_whitespace().map(str::to_string).collect()
            }
            _ => requested_scopes.iter().cloned().collect(),
        };
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(grant.expires_in),
            scopes,
        }
    }

    /// Whether the access token's expiry has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether the granted scopes cover `required`.
    pub fn covers_scopes(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.scopes)
    }

    /// Valid iff the expiry is in the future and the scopes cover `required`.
    pub fn is_valid(&self, required: &BTreeSet<String>) -> bool {
        !self.is_expired() && self.covers_scopes(required)
    }

    /// Expired, but carrying a non-empty refresh token.
    pub fn is_refreshable(&self) -> bool {
        self.is_expired()
            && self
                .refresh_token
                .as_deref()
                .is_some_and(|token| !token.is_empty())
    }

    /// Apply a refresh grant in place: new access token and expiry, the
    /// refresh token kept unless the grant rotated it.
    pub fn apply_refresh(&mut self, grant: TokenGrant) {
        self.access_token = grant.access_token;
        self.expires_at = Utc::now() + chrono::Duration::seconds(grant.expires_in);
        if let Some(rotated) = grant.refresh_token {
            self.refresh_token = Some(rotated);
        }
        if let Some(granted) = grant.scope.as_deref() {
            if !granted.trim().is_empty() {
                self.scopes = granted.split_whitespace().map(str::to_string).collect();
            }
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}
