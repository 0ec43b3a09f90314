use std::sync::Arc;

use altbot_agent::gemini::GeminiBackend;
use altbot_agent::ollama::OllamaBackend;
use altbot_agent::{AltTextBackend, Invoker};
use altbot_core::config::LlmProviderKind;
use altbot_core::{AltbotConfig, Catalog};
use altbot_engine::{Engine, EngineSettings};
use altbot_mastodon::MastodonClient;
use altbot_social::SocialClient;
use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

/// Mastodon bot that replies with generated alt text for undescribed media.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, env = "ALTBOT_CONFIG", default_value = altbot_core::config::DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "altbot=info,altbot_engine=info,altbot_mastodon=info,altbot_agent=info".into()
            }),
        )
        .init();

    let args = Args::parse();
    let config = match AltbotConfig::load(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.code(), path = %args.config, error = %e, "failed to load config");
            return Err(e).with_context(|| format!("failed to load config from {}", args.config));
        }
    };

    let catalog = match Catalog::load(
        &config.localization.default_language,
        config.localization.path.as_deref(),
    ) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(code = e.code(), error = %e, "failed to load localization catalog");
            return Err(e).context("failed to load localization catalog");
        }
    };
    info!(languages = ?catalog.languages(), "localization ready");

    let backend = build_backend(&config).await?;
    let invoker = Invoker::new(backend);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = config.llm.provider.as_str(),
        display_name = %invoker.display_name(),
        "altbot starting"
    );
    if invoker.supports_media_files() {
        info!("video and audio descriptions enabled");
    }

    let client = Arc::new(MastodonClient::new(
        &config.server.mastodon_server,
        &config.server.access_token,
    ));
    let me = client
        .current_account()
        .await
        .context("failed to verify Mastodon credentials")?;
    info!(account_id = %me.id, acct = %me.acct, "authenticated");
    if me.acct != config.server.username {
        warn!(
            configured = %config.server.username,
            actual = %me.acct,
            "configured username does not match the authenticated account"
        );
    }

    let engine = Engine::new(
        EngineSettings::from_config(&config),
        client.clone(),
        invoker,
        Arc::new(catalog),
    );

    let events = client
        .stream_events()
        .await
        .context("failed to connect to the streaming API")?;
    info!("connected to streaming API, waiting for mentions and follows");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let maintenance = tokio::spawn(engine.maintenance.run(shutdown_rx.clone()));

    tokio::select! {
        _ = engine.dispatcher.run(events, shutdown_rx) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
    }

    // signal background tasks to stop
    let _ = shutdown_tx.send(true);
    let _ = maintenance.await;
    Ok(())
}

/// Build the configured alt-text backend.
///
/// The local backend must have its model installed; anything else is a
/// startup failure.
async fn build_backend(config: &AltbotConfig) -> anyhow::Result<Arc<dyn AltTextBackend>> {
    match config.llm.provider {
        LlmProviderKind::Gemini => {
            info!(model = %config.gemini.model, base_url = %config.gemini.base_url, "using Gemini backend");
            Ok(Arc::new(
                GeminiBackend::new(
                    config.gemini.api_key.clone(),
                    config.gemini.model.clone(),
                    config.gemini.base_url.clone(),
                )
                .with_generation(config.gemini.temperature, config.gemini.top_k)
                .with_safety(&config.safety_settings),
            ))
        }
        LlmProviderKind::Ollama => {
            let backend = OllamaBackend::new(
                config.llm.ollama_command.clone(),
                config.llm.ollama_model.clone(),
            );
            backend
                .check_model()
                .await
                .context("local model check failed")?;
            info!(model = %backend.model(), "using Ollama backend");
            Ok(Arc::new(backend))
        }
    }
}
