pub mod client;
pub mod error;
pub mod types;

pub use client::SocialClient;
pub use error::SocialError;
pub use types::{
    Account, AccountId, Attachment, Event, MediaKind, NewReply, Post, StatusId, Visibility,
};
