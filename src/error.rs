use std::fmt::Debug;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("token is empty")]
    EmptyToken,
    #[error("token is malformed: {0}")]
    MalformedToken(String),
    #[error("OpenID discovery failed: {0}")]
    DiscoveryFailed(#[source] FetchError),
    #[error("Fetching signing keys failed: {0}")]
    KeyFetchFailed(#[source] FetchError),
    #[error("token is not valid, issuer {0:?} is not accepted")]
    InvalidIssuer(String),
    #[error("token is not valid, token is expired (iat: {issued_at}, exp: {expires_at})")]
    TokenExpired { issued_at: i64, expires_at: i64 },
    #[error("token is not valid, audience {actual:?} does not match {expected:?}")]
    AudienceMismatch { expected: String, actual: String },
    #[error("token is not valid, algorithm {0:?} is not supported")]
    UnsupportedAlgorithm(String),
    #[error("token is not valid, no signing key matches kid {0:?}")]
    UnknownSigningKey(String),
    #[error("signing key {kid:?} cannot be used: {reason}")]
    InvalidSigningKey { kid: String, reason: String },
    #[error("token is not valid, rsa verification error")]
    SignatureInvalid,
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("ID token acquisition failed: {0}")]
    TokenAcquisition(String),
    #[error("application default credentials: {0}")]
    Credentials(String),
    #[error("token store error: {0}")]
    TokenStore(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure was caused by a deadline or a request timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::DeadlineExceeded(_) => true,
            Error::DiscoveryFailed(fetch) | Error::KeyFetchFailed(fetch) => fetch.is_timeout(),
            _ => false,
        }
    }

    /// Whether resetting the cached signing keys and retrying once may help.
    ///
    /// Only an unknown `kid` points at key rotation. A bad signature from a
    /// known key does not.
    pub fn suggests_key_rotation(&self) -> bool {
        matches!(self, Error::UnknownSigningKey(_))
    }
}

/// Failure of a single HTTP round-trip to the identity provider.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("get from {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("get from {url} failed: {status} {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("jwks_uri from {0} is empty")]
    MissingJwksUri(String),
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport { source, .. } if source.is_timeout())
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub(crate) fn malformed_token(error: impl std::fmt::Display) -> Error {
    Error::MalformedToken(error.to_string())
}

pub(crate) fn transport_error(url: &str) -> impl FnOnce(reqwest::Error) -> FetchError + '_ {
    move |source| FetchError::Transport {
        url: url.to_string(),
        source,
    }
}
