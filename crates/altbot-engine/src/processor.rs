//! Per-post fan-out: one task per attachment, joined before a single reply is
//! published.

use std::sync::Arc;

use altbot_agent::{FileKind, Invoker};
use altbot_core::locale::{fill, Localizer};
use altbot_social::{Attachment, MediaKind, NewReply, Post, SocialClient, StatusId};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::rate_limit::RateLimiter;
use crate::settings::EngineSettings;
use crate::tracker::ReplyTracker;
use crate::visibility;

/// Separator between per-attachment segments in the combined reply.
pub const SEGMENT_SEPARATOR: &str = "\n―\n";

const RESPONSE: &str = "response";
const PROMPT: &str = "prompt";

/// What one attachment task adds to the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    /// Generated description.
    Description(String),
    /// Localized notice or error string.
    Notice(String),
    /// The attachment already has a description; turned into at most one notice per post.
    AlreadyDescribed,
}

/// Everything one attachment task needs about the reply target.
#[derive(Clone)]
struct TargetContext {
    user: String,
    acct: String,
    language: String,
}

#[derive(Clone)]
pub struct AttachmentProcessor {
    client: Arc<dyn SocialClient>,
    invoker: Invoker,
    localizer: Arc<dyn Localizer>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<ReplyTracker>,
    settings: Arc<EngineSettings>,
    http: reqwest::Client,
}

impl AttachmentProcessor {
    pub fn new(
        client: Arc<dyn SocialClient>,
        invoker: Invoker,
        localizer: Arc<dyn Localizer>,
        limiter: Arc<RateLimiter>,
        tracker: Arc<ReplyTracker>,
        settings: Arc<EngineSettings>,
    ) -> Self {
        Self {
            client,
            invoker,
            localizer,
            limiter,
            tracker,
            settings,
            http: reqwest::Client::new(),
        }
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Describe every attachment of `source` and publish one reply to `reply_to`.
    ///
    /// Returns the published reply, or `None` when nothing was published.
    /// Per-attachment failures become localized strings inside the reply.
    pub async fn process(&self, source: &Post, reply_to: &StatusId) -> Option<Post> {
        let target = match self.client.get_post(reply_to).await {
            Ok(post) => post,
            Err(e) => {
                warn!(reply_to = %reply_to, error = %e, "failed to fetch reply target");
                return None;
            }
        };

        let ctx = TargetContext {
            user: target.account.id.to_string(),
            acct: target.account.acct.clone(),
            language: target.language_or_empty().to_string(),
        };

        let handles: Vec<_> = source
            .media_attachments
            .iter()
            .cloned()
            .map(|attachment| {
                let this = self.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { this.contribution(&attachment, &ctx).await })
            })
            .collect();

        // Joined in launch order, so segments follow attachment order.
        let mut contributions = Vec::with_capacity(handles.len());
        for handle in handles {
            let contribution = handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "attachment task failed");
                Contribution::Notice(
                    self.text(&ctx.language, EngineError::Task(e.to_string()).response_key()),
                )
            });
            contributions.push(contribution);
        }

        let segments = self.segments(contributions, &ctx.language);
        if segments.is_empty() {
            debug!(status_id = %source.id, "nothing to reply with");
            return None;
        }

        let reply = NewReply {
            text: self.compose(&ctx, &segments),
            in_reply_to: target.id.clone(),
            visibility: visibility::resolve(self.settings.reply_visibility, target.visibility),
            language: target.language.clone(),
            spoiler_text: content_warning(&source.spoiler_text),
        };

        match self.client.post_reply(&reply).await {
            Ok(posted) => {
                info!(
                    status_id = %source.id,
                    reply_id = %posted.id,
                    user = %ctx.acct,
                    segments = segments.len(),
                    "alt text reply published"
                );
                self.tracker
                    .record(source.id.clone(), posted.id.clone(), Utc::now());
                Some(posted)
            }
            Err(e) => {
                warn!(status_id = %source.id, error = %e, "failed to publish alt text reply");
                None
            }
        }
    }

    /// Work out one attachment's contribution. Never fails: errors become notices.
    async fn contribution(&self, attachment: &Attachment, ctx: &TargetContext) -> Contribution {
        if !self.limiter.increment(&ctx.user) {
            info!(user = %ctx.acct, "rate limit exceeded");
            return Contribution::Notice(self.text(&ctx.language, "rateLimitExceeded"));
        }

        if attachment.has_description() {
            return Contribution::AlreadyDescribed;
        }

        let media_ok = self.invoker.supports_media_files();
        let result = match attachment.kind {
            MediaKind::Image => self.describe_image(&attachment.url, &ctx.language).await,
            MediaKind::Video | MediaKind::Gifv if media_ok => {
                self.describe_file(&attachment.url, FileKind::Video, &ctx.language)
                    .await
            }
            MediaKind::Audio if media_ok => {
                self.describe_file(&attachment.url, FileKind::Audio, &ctx.language)
                    .await
            }
            MediaKind::Unknown if media_ok => {
                return Contribution::Notice(self.text(&ctx.language, "unsupportedFile"));
            }
            _ => {
                debug!(kind = ?attachment.kind, "backend cannot describe this media");
                return Contribution::Notice(self.text(&ctx.language, "altTextError"));
            }
        };

        match result {
            Ok(text) => {
                info!(event = generated_event(attachment.kind), user = %ctx.acct, "alt text generated");
                Contribution::Description(text)
            }
            Err(e) => {
                warn!(url = %attachment.url, error = %e, "failed to describe attachment");
                Contribution::Notice(self.text(&ctx.language, e.response_key()))
            }
        }
    }

    async fn describe_image(&self, url: &str, language: &str) -> Result<String> {
        let data = altbot_media::fetch(&self.http, url, self.settings.max_size_bytes).await?;

        let width = self.settings.downscale_width;
        let prepared = tokio::task::spawn_blocking(move || altbot_media::prepare_image(&data, width))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))??;

        debug!(url, width = prepared.width, height = prepared.height, "processing image");

        let prompt = self.localizer.get(language, "generateAltText", PROMPT);
        let text = self
            .invoker
            .describe_image(&prompt, &prepared.data, prepared.format.mime_type())
            .await?;
        Ok(text)
    }

    async fn describe_file(&self, url: &str, kind: FileKind, language: &str) -> Result<String> {
        let prefix = match kind {
            FileKind::Video => "video",
            FileKind::Audio => "audio",
        };
        let tmp = altbot_media::download_to_temp(
            &self.http,
            url,
            self.settings.max_size_bytes,
            prefix,
            kind.extension(),
        )
        .await?;

        debug!(url, path = %tmp.path().display(), "processing {prefix}");

        let prompt = self.localizer.get(language, kind.prompt_key(), PROMPT);
        let text = self.invoker.describe_file(&prompt, tmp.path(), kind).await?;
        Ok(text)
    }

    /// Turn contributions into reply segments, keeping only the first
    /// "already described" notice.
    fn segments(&self, contributions: Vec<Contribution>, language: &str) -> Vec<String> {
        let mut noted_existing = false;
        contributions
            .into_iter()
            .filter_map(|c| match c {
                Contribution::Description(text) | Contribution::Notice(text) => Some(text),
                Contribution::AlreadyDescribed if !noted_existing => {
                    noted_existing = true;
                    Some(self.text(language, "imageAlreadyHasAltText"))
                }
                Contribution::AlreadyDescribed => None,
            })
            .collect()
    }

    fn compose(&self, ctx: &TargetContext, segments: &[String]) -> String {
        let provider = self.invoker.display_name();
        let trailer = fill(
            &self.text(&ctx.language, "providedByMessage"),
            &[
                ("username", self.settings.bot_username.as_str()),
                ("provider", provider.as_str()),
            ],
        );
        format!(
            "@{} {}\n\n{}",
            ctx.acct,
            segments.join(SEGMENT_SEPARATOR),
            trailer
        )
    }

    fn text(&self, language: &str, key: &str) -> String {
        self.localizer.get(language, key, RESPONSE)
    }
}

/// Usage event recorded for a generated description.
fn generated_event(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video | MediaKind::Gifv => "video_alt_text_generated",
        MediaKind::Audio => "audio_alt_text_generated",
        MediaKind::Image | MediaKind::Unknown => "alt_text_generated",
    }
}

/// Content warning for the reply: the source's warning, marked as a reply.
pub fn content_warning(source: &str) -> String {
    if source.is_empty() || source.starts_with("re:") {
        source.to_string()
    } else {
        format!("re: {source}")
    }
}
