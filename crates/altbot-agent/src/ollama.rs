use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::provider::{AltTextBackend, FileKind, ProviderError};

/// Local backend that shells out to the Ollama CLI (`ollama run <model>`).
///
/// Images are written to a temp file whose path is appended to the prompt;
/// the CLI picks the image up from there. Video and audio are not supported.
pub struct OllamaBackend {
    command: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(command: String, model: String) -> Self {
        Self { command, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `<command> list` and confirm the configured model is installed.
    pub async fn check_model(&self) -> Result<(), ProviderError> {
        let output = self.run(&["list"]).await?;
        let stdout = String::from_utf8_lossy(&output);

        let installed = stdout.lines().skip(1).any(|line| {
            let name = line.split_whitespace().next().unwrap_or("");
            name == self.model || name.split(':').next() == Some(self.model.as_str())
        });

        if !installed {
            return Err(ProviderError::Unavailable(format!(
                "model '{}' is not installed; run `{} pull {}`",
                self.model, self.command, self.model
            )));
        }

        info!(model = %self.model, "local model available");
        Ok(())
    }

    /// Spawn the CLI with `args` and return stdout on a zero exit.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ProviderError> {
        let output = tokio::process::Command::new(&self.command)
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProviderError::Unavailable(format!(
                        "'{}' not found; install Ollama first",
                        self.command
                    ))
                } else {
                    ProviderError::Unavailable(format!("failed to spawn {}: {e}", self.command))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(1) as u16;
            return Err(ProviderError::Api {
                status: code,
                message: format!("{} exited with code {code}: {}", self.command, stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AltTextBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_media_files(&self) -> bool {
        false
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        let extension = if mime_type == "image/jpeg" { "jpeg" } else { "png" };
        let tmp = tempfile::Builder::new()
            .prefix("altbot-img-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        tokio::fs::write(tmp.path(), image).await?;

        let full_prompt = format!("{prompt} {}", tmp.path().display());

        debug!(
            command = %self.command,
            model = %self.model,
            bytes = image.len(),
            "sending image to local model"
        );

        // `tmp` stays alive until the child has exited.
        let stdout = self.run(&["run", &self.model, &full_prompt]).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn generate_from_file(
        &self,
        _prompt: &str,
        _path: &Path,
        kind: FileKind,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported(format!(
            "{} does not accept {} files",
            self.name(),
            kind.mime_type()
        )))
    }
}
