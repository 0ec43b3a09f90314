use std::sync::Arc;

use altbot_core::locale::{fill, Localizer};
use altbot_social::{Account, Event, MediaKind, NewReply, Post, SocialClient, StatusId};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::consent::{is_affirmative, ConsentRequest, ConsentStore};
use crate::dni::is_dni;
use crate::processor::AttachmentProcessor;
use crate::settings::EngineSettings;
use crate::tracker::ReplyTracker;

/// Routes stream events to their handlers, one event at a time.
pub struct Dispatcher {
    client: Arc<dyn SocialClient>,
    processor: AttachmentProcessor,
    consent: Arc<ConsentStore>,
    tracker: Arc<ReplyTracker>,
    localizer: Arc<dyn Localizer>,
    settings: Arc<EngineSettings>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn SocialClient>,
        processor: AttachmentProcessor,
        consent: Arc<ConsentStore>,
        tracker: Arc<ReplyTracker>,
        localizer: Arc<dyn Localizer>,
        settings: Arc<EngineSettings>,
    ) -> Self {
        Self {
            client,
            processor,
            consent,
            tracker,
            localizer,
            settings,
        }
    }

    /// Consume `events` in arrival order until the stream closes or shutdown is signalled.
    pub async fn run(&self, mut events: mpsc::Receiver<Event>, mut shutdown: watch::Receiver<bool>) {
        info!("dispatcher started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        error!("event stream closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub async fn handle(&self, event: Event) {
        match event {
            Event::Mention { account, status } => self.on_mention(&account, &status).await,
            Event::Follow { account } => self.on_follow(&account).await,
            Event::Update(post) => self.on_update(&post).await,
            Event::Delete(id) => {
                self.tracker.cascade_delete(&id, self.client.as_ref()).await;
            }
            Event::Error(message) => warn!(error = %message, "stream error"),
            Event::Unknown(kind) => debug!(kind = %kind, "unhandled event"),
        }
    }

    async fn on_mention(&self, account: &Account, mention: &Post) {
        if is_dni(account, &self.settings) {
            debug!(user = %account.acct, "ignoring mention from do-not-interact account");
            return;
        }

        let Some(parent_id) = mention.in_reply_to_id.as_ref() else {
            debug!(status_id = %mention.id, "mention is not a reply, nothing to describe");
            return;
        };

        let parent = match self.client.get_post(parent_id).await {
            Ok(post) => post,
            Err(e) => {
                warn!(status_id = %parent_id, error = %e, "failed to fetch mentioned post");
                return;
            }
        };

        // An answer to a consent request replies to the bot's request, which
        // itself replies to the post awaiting consent.
        if let Some(grandparent) = parent.in_reply_to_id.as_ref() {
            if let Some(request) = self.consent.pending(grandparent) {
                self.on_consent_answer(grandparent, request, account, mention)
                    .await;
                return;
            }
        }

        self.on_request(account, mention, &parent).await;
    }

    /// Someone asked the bot to describe the media of `original`.
    async fn on_request(&self, account: &Account, mention: &Post, original: &Post) {
        if original.media_attachments.is_empty() {
            debug!(status_id = %original.id, "mentioned post has no media");
            return;
        }

        let by_author = original.account.id == account.id;
        if by_author || !self.settings.ask_for_consent {
            self.processor.process(original, &mention.id).await;
            return;
        }

        let supports_media = self.processor.invoker().supports_media_files();
        let missing = original
            .media_attachments
            .iter()
            .any(|a| !a.has_description() && describable(a.kind, supports_media));
        if !missing {
            // Nothing to ask about; the reply explains the media is already described.
            self.processor.process(original, &mention.id).await;
            return;
        }

        self.request_consent(account, mention, original).await;
    }

    async fn request_consent(&self, requester: &Account, mention: &Post, original: &Post) {
        let request = ConsentRequest {
            mention_id: mention.id.clone(),
            requester: requester.acct.clone(),
            requested_at: Utc::now(),
        };
        if !self.consent.open(&original.id, request) {
            debug!(status_id = %original.id, "consent already pending");
            return;
        }

        let template = self.localizer.get(
            mention.language_or_empty(),
            "consentRequest",
            "response",
        );
        let body = fill(&template, &[("requester", requester.acct.as_str())]);

        let reply = NewReply {
            text: format!("@{} {}", original.account.acct, body),
            in_reply_to: original.id.clone(),
            visibility: original.visibility,
            language: mention.language.clone(),
            spoiler_text: String::new(),
        };

        match self.client.post_reply(&reply).await {
            Ok(posted) => info!(
                status_id = %original.id,
                request_id = %posted.id,
                requester = %requester.acct,
                author = %original.account.acct,
                "consent requested"
            ),
            Err(e) => {
                warn!(status_id = %original.id, error = %e, "failed to post consent request");
                // nobody was asked, so the next mention may try again
                self.consent.resolve(&original.id);
            }
        }
    }

    async fn on_consent_answer(
        &self,
        original_id: &StatusId,
        request: ConsentRequest,
        account: &Account,
        answer: &Post,
    ) {
        let original = match self.client.get_post(original_id).await {
            Ok(post) => post,
            Err(e) => {
                warn!(status_id = %original_id, error = %e, "failed to fetch post awaiting consent");
                return;
            }
        };

        if original.account.id != account.id {
            debug!(
                status_id = %original_id,
                user = %account.acct,
                "consent answer from someone other than the author, ignoring"
            );
            return;
        }

        self.consent.resolve(original_id);

        if is_affirmative(&answer.content) {
            info!(
                status_id = %original_id,
                requester = %request.requester,
                "consent granted"
            );
            self.processor.process(&original, &answer.id).await;
        } else {
            info!(
                status_id = %original_id,
                author = %account.acct,
                "consent declined"
            );
        }
    }

    async fn on_follow(&self, account: &Account) {
        if !self.settings.follow_back {
            return;
        }
        match self.client.follow_account(&account.id).await {
            Ok(()) => info!(event = "new_follower", user = %account.acct, "followed back"),
            Err(e) => warn!(user = %account.acct, error = %e, "failed to follow back"),
        }
    }

    /// A new post showed up in the home timeline.
    async fn on_update(&self, post: &Post) {
        if is_dni(&post.account, &self.settings) {
            return;
        }

        let supports_media = self.processor.invoker().supports_media_files();
        for attachment in &post.media_attachments {
            if !describable(attachment.kind, supports_media) {
                continue;
            }
            if attachment.has_description() {
                info!(
                    event = "human_written_alt_text",
                    user = %post.account.acct,
                    "media has human-written alt text"
                );
                continue;
            }
            self.processor.process(post, &post.id).await;
            break;
        }
    }
}

/// Media the configured backend can describe.
fn describable(kind: MediaKind, supports_media: bool) -> bool {
    kind == MediaKind::Image || (kind.is_time_based() && supports_media)
}
