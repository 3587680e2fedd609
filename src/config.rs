use std::time::Duration;

use reqwest::Client;

use crate::http::DEFAULT_MAX_RESPONSE_SIZE;

/// Well-known OpenID configuration of Google's identity platform
pub const GOOGLE_DISCOVERY_URL: &str =
    "https://accounts.google.com/.well-known/openid-configuration";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Configuration for the ID token verifier
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// URL of the OpenID configuration document that names the JWKS endpoint
    pub(crate) discovery_url: String,
    /// Upper bound for each HTTP request made during key discovery
    pub(crate) request_timeout: Duration,
    /// Largest response body accepted from the discovery or key endpoint
    pub(crate) max_response_size: usize,
    /// Optional custom HTTP client for fetching keys
    /// If not provided, a default client will be created
    pub(crate) http_client: Option<Client>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierConfig {
    /// Configuration targeting Google's production discovery document
    pub fn new() -> Self {
        Self {
            discovery_url: GOOGLE_DISCOVERY_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            http_client: None,
        }
    }

    /// Point discovery at another OpenID configuration document
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    /// Set the per-request timeout used for discovery and key fetches
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Cap the size of discovery and key-set responses
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Set a custom HTTP client
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn discovery_url(&self) -> &str {
        &self.discovery_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_response_size(&self) -> usize {
        self.max_response_size
    }
}
