//! Structural codec for compact signed tokens.
//!
//! A token is three base64url segments (no padding) joined by `.`:
//! header JSON, payload JSON and signature bytes. Decoding keeps the
//! original header and payload text so the signed bytes can be reproduced
//! exactly as the issuer signed them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::de::null_as_default;
use crate::error::malformed_token;
use crate::error::Error;
use crate::error::Result;

/// A token split into its segments.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    header_segment: &'a str,
    payload_segment: &'a str,
    signature_segment: &'a str,
    header: Vec<u8>,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

/// The header fields the verifier cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    #[serde(default, deserialize_with = "null_as_default")]
    pub alg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kid: String,
    #[serde(default)]
    pub typ: Option<String>,
}

/// Decode all three segments of `token`.
pub fn decode(token: &str) -> Result<DecodedToken<'_>> {
    let [header_segment, payload_segment, signature_segment] = split(token)?;

    Ok(DecodedToken {
        header_segment,
        payload_segment,
        signature_segment,
        header: decode_segment(header_segment, "header")?,
        payload: decode_segment(payload_segment, "payload")?,
        signature: decode_segment(signature_segment, "signature")?,
    })
}

/// Decode only the header and payload, leaving the signature untouched.
///
/// Used where the token is inspected rather than verified.
pub(crate) fn decode_unverified(token: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let [header_segment, payload_segment, _] = split(token)?;

    Ok((
        decode_segment(header_segment, "header")?,
        decode_segment(payload_segment, "payload")?,
    ))
}

/// Encode raw bytes as a token segment.
pub fn encode_segment(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn split(token: &str) -> Result<[&str; 3]> {
    let segments: Vec<&str> = token.split('.').collect();

    match segments.as_slice() {
        [header, payload, signature]
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok([*header, *payload, *signature])
        }
        _ => Err(Error::MalformedToken(format!(
            "expected 3 non-empty segments, got {}",
            segments.len()
        ))),
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| Error::MalformedToken(format!("invalid {name} encoding: {e}")))
}

impl DecodedToken<'_> {
    pub fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature_bytes(&self) -> &[u8] {
        &self.signature
    }

    pub fn header_segment(&self) -> &str {
        self.header_segment
    }

    pub fn payload_segment(&self) -> &str {
        self.payload_segment
    }

    /// The exact text that was signed: `header_segment.payload_segment`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header_segment, self.payload_segment)
    }

    pub fn signature_segment(&self) -> &str {
        self.signature_segment
    }

    pub fn header(&self) -> Result<TokenHeader> {
        serde_json::from_slice(&self.header).map_err(malformed_token)
    }
}
