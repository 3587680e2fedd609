use reqwest::Response;

use crate::error::transport_error;
use crate::error::FetchError;

/// Default upper bound for a response body read from an identity endpoint
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Read the body of `response` as text, giving up once it exceeds `limit` bytes.
///
/// A declared `Content-Length` above the limit fails before anything is read.
/// Otherwise the body is consumed chunk by chunk, so an endpoint that streams
/// without a length cannot make the reader buffer more than `limit` bytes.
pub(crate) async fn read_body(
    mut response: Response,
    url: &str,
    limit: usize,
) -> Result<String, FetchError> {
    let too_large = || FetchError::TooLarge {
        url: url.to_string(),
        limit,
    };

    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(transport_error(url))? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
