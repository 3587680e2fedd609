//! Application Default Credentials.
//!
//! Credentials are looked up the way the Google client libraries do: the file
//! named by `GOOGLE_APPLICATION_CREDENTIALS`, then the file `gcloud auth
//! application-default login` writes. Two kinds are understood:
//!
//! - `authorized_user`: a refresh token of a user account. Refreshing it
//!   returns an ID token whose audience is the OAuth client, so no audience
//!   has to be given.
//! - `service_account`: a service account key. A self-signed assertion with a
//!   `target_audience` is exchanged for an ID token for that audience.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::http;
use crate::http::DEFAULT_MAX_RESPONSE_SIZE;
use crate::retriever::MetadataServerSource;
use crate::retriever::TokenSource;

/// Google's OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const DEFAULT_TOKEN_TIMEOUT_SECS: u64 = 15;

fn google_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// Contents of an Application Default Credentials file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    AuthorizedUser(AuthorizedUser),
    ServiceAccount(ServiceAccountKey),
}

/// Refresh token of a user account, as written by `gcloud`
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "google_token_url")]
    pub token_uri: String,
}

/// Key file of a service account
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PKCS#8 PEM
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: String,
    #[serde(default = "google_token_url")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    target_audience: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenResponse {
    id_token: Option<String>,
}

impl Credentials {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Credentials(e.to_string()))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Credentials(format!("{}: {e}", path.display())))?;

        serde_json::from_str(&json)
            .map_err(|e| Error::Credentials(format!("{}: {e}", path.display())))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::AuthorizedUser(_) => "authorized_user",
            Credentials::ServiceAccount(_) => "service_account",
        }
    }

    fn token_uri(&self) -> &str {
        match self {
            Credentials::AuthorizedUser(user) => &user.token_uri,
            Credentials::ServiceAccount(key) => &key.token_uri,
        }
    }
}

impl ServiceAccountKey {
    /// Self-signed RS256 assertion asking the token endpoint for an ID token
    /// for `audience`, valid from `now` for one hour
    pub fn assertion(&self, audience: &str, now: i64) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            Error::Credentials(format!("private key of {}: {e}", self.client_email))
        })?;

        let mut header = Header::new(Algorithm::RS256);
        if !self.private_key_id.is_empty() {
            header.kid = Some(self.private_key_id.clone());
        }

        let claims = AssertionClaims {
            iss: &self.client_email,
            sub: &self.client_email,
            aud: &self.token_uri,
            target_audience: audience,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| Error::Credentials(format!("signing assertion: {e}")))
    }
}

/// Path of the credentials file written by `gcloud auth application-default login`
pub fn well_known_file() -> Option<PathBuf> {
    let config_dir = if cfg!(windows) {
        dirs::config_dir()
    } else {
        dirs::home_dir().map(|home| home.join(".config"))
    };

    config_dir.map(|dir| dir.join("gcloud").join(WELL_KNOWN_FILE))
}

/// Locate and load Application Default Credentials
///
/// A file named by `GOOGLE_APPLICATION_CREDENTIALS` must load. The well-known
/// file is optional; `None` means no credentials are configured.
pub async fn find_default_credentials() -> Result<Option<Credentials>> {
    let explicit = std::env::var_os(CREDENTIALS_ENV)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    find_credentials(explicit, well_known_file()).await
}

pub(crate) async fn find_credentials(
    explicit: Option<PathBuf>,
    well_known: Option<PathBuf>,
) -> Result<Option<Credentials>> {
    if let Some(path) = explicit {
        return Credentials::from_file(path).await.map(Some);
    }

    let Some(path) = well_known else {
        return Ok(None);
    };
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(None);
    }

    Credentials::from_file(path).await.map(Some)
}

/// The token source the environment provides
///
/// Application Default Credentials if configured, otherwise the metadata
/// server if the process runs on Google Cloud.
pub async fn default_token_source() -> Result<Arc<dyn TokenSource>> {
    select_token_source(find_default_credentials().await?, MetadataServerSource::new()).await
}

pub(crate) async fn select_token_source(
    credentials: Option<Credentials>,
    metadata: MetadataServerSource,
) -> Result<Arc<dyn TokenSource>> {
    if let Some(credentials) = credentials {
        tracing::debug!(kind = credentials.kind(), "using application default credentials");
        return Ok(Arc::new(CredentialsSource::new(credentials)));
    }

    if metadata.is_available().await {
        tracing::debug!("using the metadata server");
        return Ok(Arc::new(metadata));
    }

    Err(Error::Credentials(format!(
        "none found and no metadata server answered; set {CREDENTIALS_ENV} \
         or run `gcloud auth application-default login`"
    )))
}

/// Exchanges Application Default Credentials for ID tokens at the token endpoint
#[derive(Debug, Clone)]
pub struct CredentialsSource {
    credentials: Credentials,
    client: Client,
    timeout: Duration,
}

impl CredentialsSource {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TOKEN_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn token_request(&self, audience: &str) -> Result<Vec<(&'static str, String)>> {
        match &self.credentials {
            Credentials::AuthorizedUser(user) => Ok(vec![
                ("grant_type", "refresh_token".to_string()),
                ("client_id", user.client_id.clone()),
                ("client_secret", user.client_secret.clone()),
                ("refresh_token", user.refresh_token.clone()),
            ]),
            Credentials::ServiceAccount(key) => {
                if audience.is_empty() {
                    return Err(Error::TokenAcquisition(
                        "service account credentials require an audience (client id)".to_string(),
                    ));
                }

                Ok(vec![
                    ("grant_type", JWT_BEARER_GRANT.to_string()),
                    ("assertion", key.assertion(audience, Utc::now().timestamp())?),
                ])
            }
        }
    }
}

#[async_trait]
impl TokenSource for CredentialsSource {
    async fn fetch_id_token(&self, audience: &str) -> Result<String> {
        let form = self.token_request(audience)?;
        let token_uri = self.credentials.token_uri();

        let response = self
            .client
            .post(token_uri)
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::TokenAcquisition(format!("post to {token_uri}: {e}")))?;

        let status = response.status();
        let body = http::read_body(response, token_uri, DEFAULT_MAX_RESPONSE_SIZE)
            .await
            .map_err(|e| Error::TokenAcquisition(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::TokenAcquisition(format!(
                "post to {token_uri} failed: {status} {}",
                body.trim()
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            Error::TokenAcquisition(format!("response from {token_uri} is not valid JSON: {e}"))
        })?;

        response
            .id_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::TokenAcquisition("id_token not present".to_string()))
    }
}
