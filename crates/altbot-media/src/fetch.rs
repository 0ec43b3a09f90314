use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};

/// Download a remote resource into memory, refusing anything over `max_bytes`.
///
/// A `Content-Length` above the cap fails before the body is read. Bodies
/// without a length hint are counted while streaming and abandoned as soon
/// as they cross the cap.
pub async fn fetch(client: &reqwest::Client, url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let resp = open(client, url, max_bytes).await?;

    let mut body = Vec::with_capacity(resp.content_length().unwrap_or(0) as usize);
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        ensure_within_cap(body.len() as u64 + chunk.len() as u64, max_bytes)?;
        body.extend_from_slice(&chunk);
    }

    debug!(url, bytes = body.len(), "media fetched");
    Ok(body)
}

/// Send the GET and apply the status and length-hint checks.
pub(crate) async fn open(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
) -> Result<reqwest::Response> {
    let resp = client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        warn!(url, status = status.as_u16(), "media fetch returned error status");
        return Err(MediaError::Status(status.as_u16()));
    }

    if let Some(len) = resp.content_length() {
        ensure_within_cap(len, max_bytes)?;
    }

    Ok(resp)
}

pub(crate) fn ensure_within_cap(size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(MediaError::SizeExceeded {
            size,
            max: max_bytes,
        });
    }
    Ok(())
}
