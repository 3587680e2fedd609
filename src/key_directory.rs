use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::config::VerifierConfig;
use crate::de::null_as_default;
use crate::error::transport_error;
use crate::error::Error;
use crate::error::FetchError;
use crate::error::Result;
use crate::http;

/// One public key from a JSON Web Key Set
///
/// See <https://tools.ietf.org/html/rfc7517#appendix-A>. Absent fields are
/// empty strings; an unusable key fails later, at lookup or reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningKey {
    #[serde(deserialize_with = "null_as_default")]
    pub kty: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alg: String,
    #[serde(rename = "use", deserialize_with = "null_as_default")]
    pub usage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub kid: String,
    /// Modulus, base64url encoded big-endian unsigned integer
    #[serde(deserialize_with = "null_as_default")]
    pub n: String,
    /// Exponent, base64url encoded big-endian unsigned integer
    #[serde(deserialize_with = "null_as_default")]
    pub e: String,
}

/// The provider's current signing keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeySet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub keys: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// First key whose `kid` matches.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The parts of the OpenID configuration document used here
///
/// See <https://developers.google.com/identity/protocols/OpenIDConnect#discovery>
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoveryDocument {
    #[serde(deserialize_with = "null_as_default")]
    pub issuer: String,
    #[serde(rename = "authorization_endpoint", deserialize_with = "null_as_default")]
    pub auth_url: String,
    #[serde(rename = "token_endpoint", deserialize_with = "null_as_default")]
    pub token_url: String,
    #[serde(rename = "jwks_uri", deserialize_with = "null_as_default")]
    pub jwks_url: String,
    #[serde(rename = "userinfo_endpoint", deserialize_with = "null_as_default")]
    pub user_info_url: String,
}

/// Source of the current key set
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch_current_keys(&self) -> Result<KeySet>;
}

/// Fetches the key set through OpenID discovery
///
/// Every call performs two requests: the discovery document, then the
/// `jwks_uri` it names. Nothing is cached and nothing is retried.
#[derive(Debug, Clone)]
pub struct KeyDirectoryClient {
    client: Client,
    discovery_url: String,
    request_timeout: Duration,
    max_response_size: usize,
}

impl KeyDirectoryClient {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            client: config.http_client.unwrap_or_default(),
            discovery_url: config.discovery_url,
            request_timeout: config.request_timeout,
            max_response_size: config.max_response_size,
        }
    }

    pub async fn fetch_discovery_document(&self) -> Result<DiscoveryDocument> {
        let document: DiscoveryDocument = self
            .get_json(&self.discovery_url)
            .await
            .map_err(Error::DiscoveryFailed)?;

        if document.jwks_url.is_empty() {
            return Err(Error::DiscoveryFailed(FetchError::MissingJwksUri(
                self.discovery_url.clone(),
            )));
        }

        Ok(document)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, FetchError> {
        tracing::debug!(url = %url, "fetching");

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_error(url))?;

        let status = response.status();
        let body = http::read_body(response, url, self.max_response_size).await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body: body.trim().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl KeySource for KeyDirectoryClient {
    async fn fetch_current_keys(&self) -> Result<KeySet> {
        let DiscoveryDocument { jwks_url, .. } = self.fetch_discovery_document().await?;

        let keys: KeySet = self
            .get_json(&jwks_url)
            .await
            .map_err(Error::KeyFetchFailed)?;

        tracing::debug!(jwks_url = %jwks_url, keys = keys.len(), "fetched signing keys");

        Ok(keys)
    }
}
