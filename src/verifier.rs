use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::crypto;
use jsonwebtoken::Algorithm;

use crate::claims::ClaimSet;
use crate::config::VerifierConfig;
use crate::error::Error;
use crate::error::Result;
use crate::key_cache::KeyCache;
use crate::key_directory::KeyDirectoryClient;
use crate::key_directory::KeySet;
use crate::key_directory::KeySource;
use crate::public_key;
use crate::token;
use crate::token::DecodedToken;

/// The only signature algorithm Google uses for ID tokens
const SIGNING_ALGORITHM: &str = "RS256";

/// Trait for ID token verification
#[async_trait]
pub trait VerifyIdToken {
    /// Verify `token`, requiring its `aud` claim to equal `audience` unless
    /// `audience` is empty
    async fn verify(&self, token: &str, audience: &str) -> Result<()>;
}

/// Verifier for Google ID tokens which caches Google's public keys
///
/// Keys are fetched on first use and kept until [`reset_keys`](Self::reset_keys)
/// is called. Google rotates its keys regularly, so callers seeing
/// [`Error::UnknownSigningKey`] should reset and retry once.
///
/// See <https://developers.google.com/identity/sign-in/web/backend-auth>.
pub struct Verifier {
    keys: KeyCache,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl Verifier {
    /// Create a verifier that discovers keys as described by `config`
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_key_source(Arc::new(KeyDirectoryClient::new(config)))
    }

    /// Create a verifier that takes its keys from `source`
    pub fn with_key_source(source: Arc<dyn KeySource>) -> Self {
        Self {
            keys: KeyCache::new(source),
        }
    }

    /// Fetch the signing keys now instead of on the first verification
    pub async fn warm_up(&self) -> Result<()> {
        self.keys.get_or_fetch().await.map(|_| ())
    }

    /// Forget the cached keys. They are fetched again on the next verification.
    pub async fn reset_keys(&self) {
        self.keys.reset().await;
    }

    pub async fn has_cached_keys(&self) -> bool {
        self.keys.is_populated().await
    }

    /// Like [`verify`](VerifyIdToken::verify), but gives up once `deadline` has
    /// elapsed, aborting any key fetch still in flight.
    pub async fn verify_within(
        &self,
        token: &str,
        audience: &str,
        deadline: Duration,
    ) -> Result<()> {
        tokio::time::timeout(deadline, self.verify(token, audience))
            .await
            .map_err(|_| Error::DeadlineExceeded(deadline))?
    }

    async fn verify_id_token(&self, token: &str, audience: &str) -> Result<()> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }

        let decoded = token::decode(token)?;

        let claims = ClaimSet::parse(decoded.payload_bytes())?;
        check_claims(&claims, audience, Utc::now().timestamp())?;

        let keys = self.keys.get_or_fetch().await?;

        check_signature(&decoded, &keys)
    }
}

#[async_trait]
impl VerifyIdToken for Verifier {
    async fn verify(&self, token: &str, audience: &str) -> Result<()> {
        let result = self.verify_id_token(token, audience).await;

        if let Err(error) = &result {
            tracing::debug!(%error, "ID token rejected");
        }

        result
    }
}

/// Check issuer, validity window and, if `audience` is not empty, audience.
fn check_claims(claims: &ClaimSet, audience: &str, now: i64) -> Result<()> {
    if !claims.has_accepted_issuer() {
        return Err(Error::InvalidIssuer(claims.iss.clone()));
    }

    if !claims.is_time_valid(now) {
        return Err(Error::TokenExpired {
            issued_at: claims.iat,
            expires_at: claims.exp,
        });
    }

    if !audience.is_empty() && audience != claims.aud {
        return Err(Error::AudienceMismatch {
            expected: audience.to_string(),
            actual: claims.aud.clone(),
        });
    }

    Ok(())
}

/// Verify the RS256 signature of `decoded` with the key its header names.
fn check_signature(decoded: &DecodedToken<'_>, keys: &KeySet) -> Result<()> {
    let header = decoded.header()?;

    // An absent `alg` is left to the signature check.
    if !header.alg.is_empty() && header.alg != SIGNING_ALGORITHM {
        return Err(Error::UnsupportedAlgorithm(header.alg));
    }

    let signing_key = keys
        .find(&header.kid)
        .ok_or_else(|| Error::UnknownSigningKey(header.kid.clone()))?;

    let decoding_key = public_key::decoding_key(signing_key)?;

    let valid = crypto::verify(
        decoded.signature_segment(),
        decoded.signing_input().as_bytes(),
        &decoding_key,
        Algorithm::RS256,
    )
    .map_err(|e| Error::InvalidSigningKey {
        kid: signing_key.kid.clone(),
        reason: e.to_string(),
    })?;

    if !valid {
        return Err(Error::SignatureInvalid);
    }

    Ok(())
}
