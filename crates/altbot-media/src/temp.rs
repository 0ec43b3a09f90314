use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;
use crate::fetch::{ensure_within_cap, open};

/// Stream a remote file to a temporary file with the same size cap as [`crate::fetch`].
///
/// The file is deleted when the returned handle is dropped, including on
/// every error path inside this function.
pub async fn download_to_temp(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
    prefix: &str,
    extension: &str,
) -> Result<NamedTempFile> {
    let resp = open(client, url, max_bytes).await?;

    let tmp = tempfile::Builder::new()
        .prefix(&format!("{prefix}-"))
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    let mut file = tokio::fs::File::from_std(tmp.reopen()?);

    let mut written: u64 = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        ensure_within_cap(written, max_bytes)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    debug!(url, path = %tmp.path().display(), bytes = written, "media downloaded to temp file");
    Ok(tmp)
}
