use altbot_social::{Event, SocialError};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::api::event_from_frame;
use crate::client::check_status;
use crate::sse::SseParser;

/// Minimum delay between reconnect attempts (seconds).
const BACKOFF_BASE_SECS: u64 = 5;
/// Maximum delay between reconnect attempts (seconds).
const BACKOFF_MAX_SECS: u64 = 300;
/// Jitter fraction applied to each delay (±10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Open the user stream once.
pub(crate) async fn connect(
    http: &reqwest::Client,
    url: &str,
    token: &str,
) -> Result<reqwest::Response, SocialError> {
    let resp = http
        .get(url)
        .bearer_auth(token)
        .header("accept", "text/event-stream")
        .send()
        .await
        .map_err(|e| SocialError::ConnectionFailed(e.to_string()))?;
    check_status(resp).await
}

/// Pump frames from `first` into `tx`, reconnecting with backoff whenever the
/// stream ends. Returns once the receiver is dropped.
pub(crate) async fn run(
    http: reqwest::Client,
    url: String,
    token: String,
    first: reqwest::Response,
    tx: mpsc::Sender<Event>,
) {
    let mut resp = Some(first);
    let mut delay_secs = BACKOFF_BASE_SECS;

    loop {
        if let Some(r) = resp.take() {
            match pump(r, &tx).await {
                Pumped::ReceiverGone => return,
                Pumped::Ended(reason) => {
                    warn!(reason = %reason, "user stream ended");
                    if tx.send(Event::Error(reason)).await.is_err() {
                        return;
                    }
                    delay_secs = BACKOFF_BASE_SECS;
                }
            }
        }

        let total = delay_secs + jitter_secs(delay_secs);
        info!(retry_after_secs = total, "reconnecting to user stream");
        sleep(Duration::from_secs(total)).await;

        match connect(&http, &url, &token).await {
            Ok(r) => {
                info!("user stream reconnected");
                resp = Some(r);
            }
            Err(e) => {
                warn!(error = %e, "user stream reconnect failed");
                if tx.send(Event::Error(e.to_string())).await.is_err() {
                    return;
                }
                delay_secs = (delay_secs * 2).min(BACKOFF_MAX_SECS);
            }
        }
    }
}

enum Pumped {
    ReceiverGone,
    Ended(String),
}

async fn pump(resp: reqwest::Response, tx: &mpsc::Sender<Event>) -> Pumped {
    let mut parser = SseParser::new();
    let mut body = resp.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return Pumped::Ended(format!("stream read failed: {e}")),
        };
        for frame in parser.push(&chunk) {
            let Some(event) = event_from_frame(&frame.event, &frame.data) else {
                continue;
            };
            debug!(kind = event.kind(), "stream event");
            if tx.send(event).await.is_err() {
                return Pumped::ReceiverGone;
            }
        }
    }
    Pumped::Ended("stream closed by server".to_string())
}

/// Return a jitter offset (0 … `JITTER_FRACTION * base_secs`) as integer seconds.
fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}
