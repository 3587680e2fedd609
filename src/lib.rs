//! # google-id-token
//!
//! Retrieve, cache and verify Google-signed ID tokens for service-to-service
//! authentication.
//!
//! ## Features
//!
//! - RS256 signature verification against Google's published signing keys
//! - Key discovery through Google's OpenID configuration document
//! - Key caching with explicit reset for key rotation
//! - Issuer, validity window and audience validation
//! - ID token acquisition through Application Default Credentials or the GCE
//!   metadata server, stored per client id
//!
//! ## Example
//!
//! ```rust,no_run
//! use google_id_token::{Verifier, VerifyIdToken};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let verifier = Verifier::default();
//!     let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6Ii4uLiJ9...";
//!
//!     match verifier.verify(token, "4711.apps.googleusercontent.com").await {
//!         Err(e) if e.suggests_key_rotation() => {
//!             // Google may have rotated its keys since they were cached
//!             verifier.reset_keys().await;
//!             verifier.verify(token, "4711.apps.googleusercontent.com").await?;
//!         }
//!         other => other?,
//!     }
//!
//!     Ok(())
//! }
//! ```

mod claims;
mod config;
mod credentials;
mod de;
mod error;
mod http;
mod id_token;
mod key_cache;
mod key_directory;
mod public_key;
mod retriever;
mod store;
pub mod token;
mod verifier;

// Re-exports for public API
pub use claims::ClaimSet;
pub use claims::ACCEPTED_ISSUERS;
pub use config::VerifierConfig;
pub use config::GOOGLE_DISCOVERY_URL;
pub use credentials::default_token_source;
pub use credentials::find_default_credentials;
pub use credentials::well_known_file;
pub use credentials::AuthorizedUser;
pub use credentials::Credentials;
pub use credentials::CredentialsSource;
pub use credentials::ServiceAccountKey;
pub use credentials::GOOGLE_TOKEN_URL;
pub use error::Error;
pub use error::FetchError;
pub use error::Result;
pub use http::DEFAULT_MAX_RESPONSE_SIZE;
pub use id_token::IdToken;
pub use key_cache::KeyCache;
pub use key_directory::DiscoveryDocument;
pub use key_directory::KeyDirectoryClient;
pub use key_directory::KeySet;
pub use key_directory::KeySource;
pub use key_directory::SigningKey;
pub use public_key::decoding_key;
pub use public_key::RsaComponents;
pub use retriever::MetadataServerSource;
pub use retriever::Retriever;
pub use retriever::TokenSource;
pub use retriever::METADATA_SERVER_URL;
pub use store::FileTokenStore;
pub use store::TokenStore;
pub use verifier::Verifier;
pub use verifier::VerifyIdToken;
