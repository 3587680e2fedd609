use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::credentials::default_token_source;
use crate::error::Error;
use crate::error::Result;
use crate::http;
use crate::http::DEFAULT_MAX_RESPONSE_SIZE;
use crate::id_token::IdToken;
use crate::store::FileTokenStore;
use crate::store::TokenStore;

/// Base URL of the GCE metadata server
pub const METADATA_SERVER_URL: &str = "http://metadata.google.internal";

/// Overrides the metadata server host, as the Google client libraries do
const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";
const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 15;
const DETECT_TIMEOUT_MILLIS: u64 = 1500;

/// Mints new ID tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A freshly signed ID token for `audience`
    async fn fetch_id_token(&self, audience: &str) -> Result<String>;
}

/// Obtains ID tokens for the instance's service account from the metadata server
#[derive(Debug, Clone)]
pub struct MetadataServerSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for MetadataServerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataServerSource {
    /// Source talking to `$GCE_METADATA_HOST`, or `metadata.google.internal`
    pub fn new() -> Self {
        let base_url = match std::env::var(METADATA_HOST_ENV) {
            Ok(host) if !host.is_empty() => format!("http://{host}"),
            _ => METADATA_SERVER_URL.to_string(),
        };

        Self {
            client: Client::new(),
            base_url,
            timeout: Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn identity_url(&self) -> String {
        format!("{}{IDENTITY_PATH}", self.base_url)
    }

    /// Whether a metadata server answers, i.e. the process runs on Google Cloud
    ///
    /// The server identifies itself with a `Metadata-Flavor: Google` response header.
    pub async fn is_available(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .header("Metadata-Flavor", "Google")
            .timeout(Duration::from_millis(DETECT_TIMEOUT_MILLIS))
            .send()
            .await;

        match response {
            Ok(response) => response
                .headers()
                .get("Metadata-Flavor")
                .is_some_and(|flavor| flavor == "Google"),
            Err(error) => {
                tracing::debug!(%error, base_url = %self.base_url, "metadata server not reachable");
                false
            }
        }
    }
}

#[async_trait]
impl TokenSource for MetadataServerSource {
    async fn fetch_id_token(&self, audience: &str) -> Result<String> {
        if audience.is_empty() {
            return Err(Error::TokenAcquisition(
                "the metadata server requires an audience (client id)".to_string(),
            ));
        }

        let identity_url = self.identity_url();
        let acquisition_error =
            |e: reqwest::Error| Error::TokenAcquisition(format!("get from {identity_url}: {e}"));

        let response = self
            .client
            .get(&identity_url)
            .query(&[("audience", audience), ("format", "full")])
            .header("Metadata-Flavor", "Google")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(acquisition_error)?;

        let status = response.status();
        let body = http::read_body(response, &identity_url, DEFAULT_MAX_RESPONSE_SIZE)
            .await
            .map_err(|e| Error::TokenAcquisition(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::TokenAcquisition(format!(
                "get from {identity_url} failed: {status} {}",
                body.trim()
            )));
        }

        let token = body.trim();
        if token.is_empty() {
            return Err(Error::TokenAcquisition("id_token not present".to_string()));
        }

        Ok(token.to_string())
    }
}

/// Retrieves Google ID tokens, reusing a stored token while it is still valid
pub struct Retriever {
    client_id: String,
    source: Arc<dyn TokenSource>,
    store: Arc<dyn TokenStore>,
}

impl Retriever {
    /// Retriever using the environment's credentials and a file store in the
    /// user's cache directory
    ///
    /// Application Default Credentials are preferred; the metadata server is
    /// used only when none are configured and it answers. See
    /// [`default_token_source`](crate::default_token_source).
    pub async fn new(client_id: impl Into<String>) -> Result<Self> {
        Ok(Self::with_parts(
            client_id,
            default_token_source().await?,
            Arc::new(FileTokenStore::in_cache_dir()),
        ))
    }

    pub fn with_parts(
        client_id: impl Into<String>,
        source: Arc<dyn TokenSource>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            source,
            store,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Obtain a new ID token and store it
    ///
    /// Failing to store the token is logged and otherwise ignored.
    pub async fn get_new_id_token(&self) -> Result<IdToken> {
        let jwt = self.source.fetch_id_token(&self.client_id).await?;
        let token = IdToken::parse(jwt)?;

        if let Err(error) = self.store.save(&self.client_id, token.jwt()).await {
            tracing::warn!(%error, "failed to store ID token");
        }

        Ok(token)
    }

    /// Return the stored ID token if it is still valid, otherwise obtain a new one
    pub async fn get_id_token(&self) -> Result<IdToken> {
        match self.cached_id_token().await {
            Some(token) if token.check_time() => {
                tracing::debug!("using stored ID token");
                Ok(token)
            }
            _ => self.get_new_id_token().await,
        }
    }

    async fn cached_id_token(&self) -> Option<IdToken> {
        let jwt = match self.store.load(&self.client_id).await {
            Ok(jwt) => jwt?,
            Err(error) => {
                tracing::warn!(%error, "failed to load stored ID token");
                return None;
            }
        };

        IdToken::parse(jwt)
            .inspect_err(|error| tracing::debug!(%error, "ignoring unparsable stored ID token"))
            .ok()
    }
}
