//! Wire types for the Mastodon REST and streaming APIs and their conversion
//! into the platform-neutral model.

use altbot_social::{Account, AccountId, Attachment, Event, MediaKind, Post, StatusId, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiAccount {
    pub id: String,
    pub acct: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    pub id: String,
    pub account: ApiAccount,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_attachments: Vec<ApiAttachment>,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub account: ApiAccount,
    #[serde(default)]
    pub status: Option<ApiStatus>,
}

/// Body of `POST /api/v1/statuses`.
#[derive(Debug, Serialize)]
pub struct StatusForm<'a> {
    pub status: &'a str,
    pub in_reply_to_id: &'a str,
    pub visibility: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub spoiler_text: &'a str,
}

impl From<ApiAccount> for Account {
    fn from(a: ApiAccount) -> Self {
        Account {
            id: AccountId(a.id),
            acct: a.acct,
            bot: a.bot,
            note: crate::html::html_to_text(&a.note),
        }
    }
}

impl From<ApiAttachment> for Attachment {
    fn from(a: ApiAttachment) -> Self {
        Attachment {
            kind: MediaKind::parse(&a.kind),
            url: a.url.unwrap_or_default(),
            description: a.description.unwrap_or_default(),
        }
    }
}

impl From<ApiStatus> for Post {
    fn from(s: ApiStatus) -> Self {
        Post {
            id: StatusId(s.id),
            account: s.account.into(),
            // Anything newer than the four classic levels is treated as the narrowest.
            visibility: s.visibility.parse().unwrap_or(Visibility::Direct),
            spoiler_text: s.spoiler_text,
            language: s.language.filter(|l| !l.is_empty()),
            content: crate::html::html_to_text(&s.content),
            media_attachments: s.media_attachments.into_iter().map(Into::into).collect(),
            in_reply_to_id: s.in_reply_to_id.map(StatusId),
        }
    }
}

/// Translate one streaming frame into an [`Event`].
///
/// Returns `None` for frames that carry nothing (heartbeats, empty events).
pub fn event_from_frame(event: &str, data: &str) -> Option<Event> {
    match event {
        "" => None,
        "notification" => Some(match serde_json::from_str::<ApiNotification>(data) {
            Ok(n) => notification_event(n),
            Err(e) => Event::Error(format!("malformed notification: {e}")),
        }),
        "update" => Some(match serde_json::from_str::<ApiStatus>(data) {
            Ok(s) => Event::Update(s.into()),
            Err(e) => Event::Error(format!("malformed update: {e}")),
        }),
        "delete" => Some(Event::Delete(StatusId(data.trim().to_string()))),
        other => Some(Event::Unknown(other.to_string())),
    }
}

fn notification_event(n: ApiNotification) -> Event {
    match (n.kind.as_str(), n.status) {
        ("mention", Some(status)) => Event::Mention {
            account: n.account.into(),
            status: status.into(),
        },
        ("mention", None) => Event::Error("mention notification without a status".into()),
        ("follow", _) => Event::Follow {
            account: n.account.into(),
        },
        (other, _) => Event::Unknown(format!("notification:{other}")),
    }
}
