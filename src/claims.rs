use serde::Deserialize;
use serde::Serialize;

use crate::de::null_as_default;
use crate::error::malformed_token;
use crate::error::Result;

/// Issuers Google uses for ID tokens.
pub const ACCEPTED_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims carried in the payload of a Google ID token
///
/// Missing fields decode to their defaults. An absent `iat` or `exp`
/// becomes zero, which fails [`ClaimSet::is_time_valid`] for any real clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimSet {
    /// Issuer - `accounts.google.com` or `https://accounts.google.com`
    #[serde(deserialize_with = "null_as_default")]
    pub iss: String,
    /// Space-delimited list of the permissions the token was requested for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Audience - the intended recipient of the token
    #[serde(deserialize_with = "null_as_default")]
    pub aud: String,
    /// Authorized party - the client the token was issued to
    #[serde(deserialize_with = "null_as_default")]
    pub azp: String,
    /// Expiration time as Unix timestamp
    #[serde(deserialize_with = "null_as_default")]
    pub exp: i64,
    /// Issued at time as Unix timestamp
    #[serde(deserialize_with = "null_as_default")]
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Subject - the unique Google account id
    #[serde(deserialize_with = "null_as_default")]
    pub sub: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email_verified: bool,
    /// Hosted domain of a Google Workspace account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd: Option<String>,
}

impl ClaimSet {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(malformed_token)
    }

    /// `iat <= now <= exp`
    pub fn is_time_valid(&self, now: i64) -> bool {
        now >= self.iat && now <= self.exp
    }

    pub fn has_accepted_issuer(&self) -> bool {
        ACCEPTED_ISSUERS.contains(&self.iss.as_str())
    }
}
