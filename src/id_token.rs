use chrono::Utc;

use crate::claims::ClaimSet;
use crate::error::malformed_token;
use crate::error::Result;
use crate::token;

/// A Google ID token whose header and claims have been decoded but whose
/// signature has not been checked
///
/// Use [`Verifier`](crate::Verifier) to establish authenticity.
#[derive(Debug, Clone)]
pub struct IdToken {
    jwt: String,
    header: String,
    payload: String,
    claims: ClaimSet,
}

impl IdToken {
    pub fn parse(jwt: impl Into<String>) -> Result<Self> {
        let jwt = jwt.into();
        let (header, payload) = token::decode_unverified(&jwt)?;
        let claims = ClaimSet::parse(&payload)?;

        Ok(Self {
            header: String::from_utf8(header).map_err(malformed_token)?,
            payload: String::from_utf8(payload).map_err(malformed_token)?,
            jwt,
            claims,
        })
    }

    /// Whether the token is inside its `iat`..=`exp` window right now.
    pub fn check_time(&self) -> bool {
        self.claims.is_time_valid(Utc::now().timestamp())
    }

    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// Decoded header JSON
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Decoded payload JSON
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    pub fn into_jwt(self) -> String {
        self.jwt
    }
}
