//! Mastodon implementation of [`altbot_social::SocialClient`].

pub mod api;
pub mod client;
pub mod html;
pub mod sse;
pub mod stream;

pub use client::MastodonClient;
