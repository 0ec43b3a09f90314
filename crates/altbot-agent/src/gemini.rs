//! Hosted Gemini backend.
//!
//! Images go inline (base64) in a single `generateContent` call. Video and
//! audio go through the Files API first:
//!   1. start a resumable upload and read the session URL from the response headers,
//!   2. upload and finalize the bytes in one request,
//!   3. poll the file until it leaves `PROCESSING`,
//!   4. reference the file URI from `generateContent`.

use std::path::Path;
use std::time::Duration;

use altbot_core::config::SafetySettings;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::provider::{AltTextBackend, FileKind, ProviderError};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    top_k: i32,
    /// Block thresholds, index-aligned with `HARM_CATEGORIES`.
    thresholds: [&'static str; 4],
    /// Overrides the per-kind poll interval (tests use zero).
    poll_interval: Option<Duration>,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: 0.7,
            top_k: 1,
            thresholds: ["BLOCK_NONE"; 4],
            poll_interval: None,
        }
    }

    pub fn with_generation(mut self, temperature: f32, top_k: i32) -> Self {
        self.temperature = temperature;
        self.top_k = top_k;
        self
    }

    pub fn with_safety(mut self, safety: &SafetySettings) -> Self {
        self.thresholds = [
            harm_threshold(&safety.harassment_threshold),
            harm_threshold(&safety.hate_speech_threshold),
            harm_threshold(&safety.sexually_explicit_threshold),
            harm_threshold(&safety.dangerous_content_threshold),
        ];
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_body(&self, parts: Vec<serde_json::Value>) -> serde_json::Value {
        let safety: Vec<serde_json::Value> = HARM_CATEGORIES
            .iter()
            .zip(self.thresholds.iter())
            .map(|(category, threshold)| {
                serde_json::json!({ "category": category, "threshold": threshold })
            })
            .collect();

        serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.temperature,
                "topK": self.top_k,
            },
            "safetySettings": safety,
        })
    }

    async fn generate(&self, parts: Vec<serde_json::Value>) -> Result<String, ProviderError> {
        let body = self.build_body(parts);

        debug!(model = %self.model, "sending generateContent request to Gemini");

        let resp = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: 5000,
            });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(reason) = api_resp
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!(reason, "Gemini blocked the prompt");
        }

        Ok(collect_text(&api_resp))
    }

    /// Upload a file through the resumable Files API and wait until it is usable.
    async fn upload_file(&self, path: &Path, kind: FileKind) -> Result<UploadedFile, ProviderError> {
        let data = tokio::fs::read(path).await?;
        let display_name = match kind {
            FileKind::Video => "Video for Alt-Text",
            FileKind::Audio => "Audio for Alt-Text",
        };

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", kind.mime_type())
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(map_send_error)?;

        let start = ensure_success(start, "upload start").await?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Parse("upload session URL missing".into()))?;

        let finalize = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(map_send_error)?;
        let finalize = ensure_success(finalize, "upload finalize").await?;

        let mut file = finalize
            .json::<UploadResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?
            .file;

        info!(name = %file.name, state = %file.state, "file uploaded to Gemini");

        let interval = self
            .poll_interval
            .unwrap_or_else(|| kind.default_poll_interval());
        while file.state == "PROCESSING" {
            tokio::time::sleep(interval).await;
            file = self.get_file(&file.name).await?;
            debug!(name = %file.name, state = %file.state, "polled uploaded file");
        }

        if file.state == "FAILED" {
            return Err(ProviderError::Unavailable(format!(
                "Gemini failed to process uploaded file {}",
                file.name
            )));
        }

        Ok(file)
    }

    async fn get_file(&self, name: &str) -> Result<UploadedFile, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(map_send_error)?;
        let resp = ensure_success(resp, "file status").await?;
        resp.json::<UploadedFile>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl AltTextBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn supports_media_files(&self) -> bool {
        true
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        let parts = vec![
            serde_json::json!({ "text": prompt }),
            serde_json::json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": STANDARD.encode(image),
                }
            }),
        ];
        self.generate(parts).await
    }

    async fn generate_from_file(
        &self,
        prompt: &str,
        path: &Path,
        kind: FileKind,
    ) -> Result<String, ProviderError> {
        let file = self.upload_file(path, kind).await?;
        let mime_type = file
            .mime_type
            .clone()
            .unwrap_or_else(|| kind.mime_type().to_string());

        let parts = vec![
            serde_json::json!({
                "file_data": { "mime_type": mime_type, "file_uri": file.uri }
            }),
            serde_json::json!({ "text": prompt }),
        ];
        self.generate(parts).await
    }
}

/// Map a config threshold (`none`/`low`/`medium`/`high`) to the API constant.
pub fn harm_threshold(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "low" => "BLOCK_LOW_AND_ABOVE",
        "medium" => "BLOCK_MEDIUM_AND_ABOVE",
        "high" => "BLOCK_ONLY_HIGH",
        _ => "BLOCK_NONE",
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Http(e)
    }
}

async fn ensure_success(
    resp: reqwest::Response,
    step: &str,
) -> Result<reqwest::Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    warn!(status, step, body = %text, "Gemini Files API error");
    Err(ProviderError::Api {
        status,
        message: text,
    })
}

/// Concatenate the text parts of every candidate.
fn collect_text(resp: &GenerateResponse) -> String {
    resp.candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect()
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    name: String,
    #[serde(default)]
    uri: String,
    mime_type: Option<String>,
    #[serde(default = "default_state")]
    state: String,
}

fn default_state() -> String {
    "ACTIVE".to_string()
}
