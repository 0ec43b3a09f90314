//! In-process fakes for the social client and the alt-text backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use altbot_agent::{AltTextBackend, FileKind, Invoker, ProviderError};
use altbot_core::Catalog;
use altbot_engine::{Engine, EngineSettings};
use altbot_social::{
    Account, AccountId, Attachment, Event, MediaKind, NewReply, Post, SocialClient, SocialError,
    StatusId, Visibility,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct MockClient {
    pub posts: Mutex<HashMap<StatusId, Post>>,
    pub replies: Mutex<Vec<NewReply>>,
    pub deleted: Mutex<Vec<StatusId>>,
    pub followed: Mutex<Vec<AccountId>>,
    pub fail_delete: bool,
    pub fail_publish: bool,
    pub next_id: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id.clone(), post);
    }

    pub fn replies(&self) -> Vec<NewReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<StatusId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_events(&self) -> Result<mpsc::Receiver<Event>, SocialError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn get_post(&self, id: &StatusId) -> Result<Post, SocialError> {
        self.posts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SocialError::NotFound { id: id.to_string() })
    }

    async fn post_reply(&self, reply: &NewReply) -> Result<Post, SocialError> {
        if self.fail_publish {
            return Err(SocialError::Api {
                status: 500,
                message: "boom".into(),
            });
        }
        self.replies.lock().unwrap().push(reply.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let post = Post {
            id: StatusId(format!("reply-{n}")),
            account: account("altbot", "altbot"),
            visibility: reply.visibility,
            spoiler_text: reply.spoiler_text.clone(),
            language: reply.language.clone(),
            content: reply.text.clone(),
            media_attachments: Vec::new(),
            in_reply_to_id: Some(reply.in_reply_to.clone()),
        };
        self.add(post.clone());
        Ok(post)
    }

    async fn delete_post(&self, id: &StatusId) -> Result<(), SocialError> {
        self.deleted.lock().unwrap().push(id.clone());
        if self.fail_delete {
            return Err(SocialError::Request("connection reset".into()));
        }
        Ok(())
    }

    async fn follow_account(&self, id: &AccountId) -> Result<(), SocialError> {
        self.followed.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn current_account(&self) -> Result<Account, SocialError> {
        Ok(account("0", "altbot"))
    }
}

/// Backend that answers every request with a fixed description.
pub struct MockBackend {
    pub reply: String,
    pub media_files: bool,
    pub calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            media_files: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AltTextBackend for MockBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn supports_media_files(&self) -> bool {
        self.media_files
    }

    async fn generate_from_image(
        &self,
        _prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.is_empty() || !mime_type.starts_with("image/") {
            return Err(ProviderError::Parse("bad image".into()));
        }
        Ok(self.reply.clone())
    }

    async fn generate_from_file(
        &self,
        _prompt: &str,
        path: &Path,
        _kind: FileKind,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(ProviderError::Parse("missing file".into()));
        }
        Ok(self.reply.clone())
    }
}

pub fn account(id: &str, acct: &str) -> Account {
    Account {
        id: AccountId::from(id),
        acct: acct.to_string(),
        bot: false,
        note: String::new(),
    }
}

pub fn image(url: &str, description: &str) -> Attachment {
    Attachment {
        kind: MediaKind::Image,
        url: url.to_string(),
        description: description.to_string(),
    }
}

pub fn post(id: &str, author: &Account, attachments: Vec<Attachment>, parent: Option<&str>) -> Post {
    Post {
        id: StatusId::from(id),
        account: author.clone(),
        visibility: Visibility::Public,
        spoiler_text: String::new(),
        language: Some("en".into()),
        content: String::new(),
        media_attachments: attachments,
        in_reply_to_id: parent.map(StatusId::from),
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([120, 180, 60]),
    ));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serve a small PNG at `/<name>` and return its URL.
pub async fn serve_png(server: &mut mockito::ServerGuard, name: &str) -> String {
    server
        .mock("GET", format!("/{name}").as_str())
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png_bytes(64, 48))
        .create_async()
        .await;
    format!("{}/{name}", server.url())
}

pub struct Harness {
    pub client: Arc<MockClient>,
    pub backend: Arc<MockBackend>,
    pub engine: Engine,
    pub catalog: Arc<Catalog>,
}

pub fn harness(client: MockClient, backend: MockBackend, settings: EngineSettings) -> Harness {
    let client = Arc::new(client);
    let backend = Arc::new(backend);
    let catalog = Arc::new(Catalog::builtin());
    let engine = Engine::new(
        settings,
        client.clone(),
        Invoker::new(backend.clone()),
        catalog.clone(),
    );
    Harness {
        client,
        backend,
        engine,
        catalog,
    }
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        bot_username: "altbot".into(),
        ..Default::default()
    }
}
