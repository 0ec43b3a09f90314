use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform identifier of a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusId(pub String);

impl StatusId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StatusId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StatusId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Platform identifier of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// `user` for local accounts, `user@host` for remote ones.
    pub acct: String,
    #[serde(default)]
    pub bot: bool,
    /// Profile bio as plain text.
    #[serde(default)]
    pub note: String,
}

/// Post audience, ordered from widest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Public,
        Visibility::Unlisted,
        Visibility::Private,
        Visibility::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

/// Media type of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gifv,
    Audio,
    Unknown,
}

impl MediaKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "gifv" => MediaKind::Gifv,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Unknown,
        }
    }

    /// Video, animated GIF or audio: media the hosted backend consumes as a file.
    pub fn is_time_based(&self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Gifv | MediaKind::Audio)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: MediaKind,
    pub url: String,
    /// Existing description; empty when the author didn't write one.
    #[serde(default)]
    pub description: String,
}

impl Attachment {
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// Snapshot of a post, fetched on demand and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: StatusId,
    pub account: Account,
    pub visibility: Visibility,
    /// Content warning; empty when none.
    #[serde(default)]
    pub spoiler_text: String,
    pub language: Option<String>,
    /// Body as plain text.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_attachments: Vec<Attachment>,
    pub in_reply_to_id: Option<StatusId>,
}

impl Post {
    pub fn language_or_empty(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }
}

/// A reply to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub text: String,
    pub in_reply_to: StatusId,
    pub visibility: Visibility,
    pub language: Option<String>,
    pub spoiler_text: String,
}

/// Inbound stream event.
#[derive(Debug, Clone)]
pub enum Event {
    /// Someone mentioned the bot in `status`.
    Mention { account: Account, status: Post },
    /// Someone followed the bot.
    Follow { account: Account },
    /// A new post appeared in the home timeline.
    Update(Post),
    /// A post was deleted.
    Delete(StatusId),
    /// The transport reported an error; the stream itself continues.
    Error(String),
    /// Anything the engine has no handler for (payload kind name).
    Unknown(String),
}

impl Event {
    pub fn kind(&self) -> &str {
        match self {
            Event::Mention { .. } => "mention",
            Event::Follow { .. } => "follow",
            Event::Update(_) => "update",
            Event::Delete(_) => "delete",
            Event::Error(_) => "error",
            Event::Unknown(kind) => kind,
        }
    }
}
