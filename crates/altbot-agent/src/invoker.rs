use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::postprocess::normalize;
use crate::provider::{AltTextBackend, FileKind, ProviderError};

/// Front door to the configured backend.
///
/// Every result is normalized; a description that normalizes to nothing is
/// reported as [`ProviderError::EmptyResponse`].
#[derive(Clone)]
pub struct Invoker {
    backend: Arc<dyn AltTextBackend>,
}

impl Invoker {
    pub fn new(backend: Arc<dyn AltTextBackend>) -> Self {
        Self { backend }
    }

    /// Backend name as shown to people: first letter upper-cased.
    pub fn display_name(&self) -> String {
        let name = self.backend.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn supports_media_files(&self) -> bool {
        self.backend.supports_media_files()
    }

    pub async fn describe_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        let raw = self
            .backend
            .generate_from_image(prompt, image, mime_type)
            .await?;
        finish(self.backend.name(), &raw)
    }

    pub async fn describe_file(
        &self,
        prompt: &str,
        path: &Path,
        kind: FileKind,
    ) -> Result<String, ProviderError> {
        let raw = self.backend.generate_from_file(prompt, path, kind).await?;
        finish(self.backend.name(), &raw)
    }
}

fn finish(backend: &str, raw: &str) -> Result<String, ProviderError> {
    let text = normalize(raw);
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    debug!(backend, chars = text.len(), "description generated");
    Ok(text)
}
