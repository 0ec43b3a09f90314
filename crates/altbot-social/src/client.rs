use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::SocialError,
    types::{Account, AccountId, Event, NewReply, Post, StatusId},
};

/// Everything the reply engine needs from the social platform.
///
/// Implementations own connection, authentication and streaming transport;
/// the engine only consumes typed events and issues these calls.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Stable lowercase identifier for logging (e.g. `"mastodon"`).
    fn name(&self) -> &str;

    /// Start the event stream. Events arrive in server order on the receiver;
    /// the stream ends when the receiver yields `None`.
    async fn stream_events(&self) -> Result<mpsc::Receiver<Event>, SocialError>;

    /// Fetch a fresh snapshot of a post.
    async fn get_post(&self, id: &StatusId) -> Result<Post, SocialError>;

    /// Publish a reply and return the created post.
    async fn post_reply(&self, reply: &NewReply) -> Result<Post, SocialError>;

    async fn delete_post(&self, id: &StatusId) -> Result<(), SocialError>;

    async fn follow_account(&self, id: &AccountId) -> Result<(), SocialError>;

    /// The account the client is authenticated as.
    async fn current_account(&self) -> Result<Account, SocialError>;
}
