use altbot_social::{Account, AccountId, Event, NewReply, Post, SocialClient, SocialError, StatusId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiAccount, ApiStatus, StatusForm};
use crate::stream;

/// Capacity of the event channel handed to the dispatcher.
const EVENT_BUFFER: usize = 256;

/// REST + streaming client for one Mastodon account.
#[derive(Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MastodonClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, SocialError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SocialError::Request(e.to_string()))?;
        check_status(resp).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, SocialError> {
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SocialError::Parse(e.to_string()))
    }
}

/// Map a non-success response to the matching [`SocialError`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SocialError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    let path = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    match code {
        401 | 403 => Err(SocialError::AuthFailed(body)),
        404 => Err(SocialError::NotFound { id: path }),
        _ => {
            warn!(status = code, body = %body, "Mastodon API error");
            Err(SocialError::Api {
                status: code,
                message: body,
            })
        }
    }
}

#[async_trait]
impl SocialClient for MastodonClient {
    fn name(&self) -> &str {
        "mastodon"
    }

    async fn stream_events(&self) -> Result<mpsc::Receiver<Event>, SocialError> {
        let url = self.url("/api/v1/streaming/user");
        let first = stream::connect(&self.http, &url, &self.token).await?;
        info!(url = %url, "connected to user stream");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(stream::run(
            self.http.clone(),
            url,
            self.token.clone(),
            first,
            tx,
        ));
        Ok(rx)
    }

    async fn get_post(&self, id: &StatusId) -> Result<Post, SocialError> {
        let status: ApiStatus = self
            .send_json(self.http.get(self.url(&format!("/api/v1/statuses/{id}"))))
            .await
            .map_err(|e| match e {
                SocialError::NotFound { .. } => SocialError::NotFound { id: id.to_string() },
                other => other,
            })?;
        Ok(status.into())
    }

    async fn post_reply(&self, reply: &NewReply) -> Result<Post, SocialError> {
        let form = StatusForm {
            status: &reply.text,
            in_reply_to_id: reply.in_reply_to.as_str(),
            visibility: reply.visibility.as_str(),
            language: reply.language.as_deref().filter(|l| !l.is_empty()),
            spoiler_text: &reply.spoiler_text,
        };
        let status: ApiStatus = self
            .send_json(self.http.post(self.url("/api/v1/statuses")).json(&form))
            .await?;
        debug!(status_id = %status.id, in_reply_to = %reply.in_reply_to, "reply posted");
        Ok(status.into())
    }

    async fn delete_post(&self, id: &StatusId) -> Result<(), SocialError> {
        self.send(self.http.delete(self.url(&format!("/api/v1/statuses/{id}"))))
            .await?;
        Ok(())
    }

    async fn follow_account(&self, id: &AccountId) -> Result<(), SocialError> {
        self.send(
            self.http
                .post(self.url(&format!("/api/v1/accounts/{id}/follow"))),
        )
        .await?;
        Ok(())
    }

    async fn current_account(&self) -> Result<Account, SocialError> {
        let account: ApiAccount = self
            .send_json(self.http.get(self.url("/api/v1/accounts/verify_credentials")))
            .await?;
        Ok(account.into())
    }
}
