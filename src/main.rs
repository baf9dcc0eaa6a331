//! Daily digest runner: one pipeline pass per invocation, exit code 0/1 by
//! run success. Intended to sit behind cron or a systemd timer.

use ai_news_digest::ai::openai::OpenAiClient;
use ai_news_digest::config::{load_channels_default, AppConfig};
use ai_news_digest::notify::EmailNotifier;
use ai_news_digest::pipeline::{Pipeline, PipelineOptions};
use ai_news_digest::profile::UserProfile;
use ai_news_digest::sources::{
    anthropic_news::AnthropicNewsSource, openai_news::OpenAiNewsSource, youtube::YoutubeSource,
    ContentSource,
};
use ai_news_digest::store::ContentStore;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ai_news_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn run() -> Result<bool> {
    let config = AppConfig::from_env()?;

    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let store = ContentStore::open(Path::new(&config.db_path)).await?;
    store.init_schema().await?;

    let http = reqwest::Client::builder()
        .user_agent("ai-news-digest/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building http client")?;

    let channels = load_channels_default()?;
    if channels.is_empty() {
        warn!("no youtube channels configured; youtube source disabled");
    }
    let mut sources: Vec<Arc<dyn ContentSource>> = vec![
        Arc::new(OpenAiNewsSource::new(http.clone())),
        Arc::new(AnthropicNewsSource::new(http.clone())),
    ];
    if !channels.is_empty() {
        sources.push(Arc::new(YoutubeSource::new(channels, http.clone())));
    }

    let ai = Arc::new(OpenAiClient::from_env()?);
    let notifier = Arc::new(EmailNotifier::from_env()?);
    let profile = UserProfile::load_default()?;

    let pipeline = Pipeline::new(
        store,
        sources,
        ai.clone(),
        ai.clone(),
        ai,
        notifier,
        profile,
        config.recipients.clone(),
    )
    .with_options(PipelineOptions {
        enrich_concurrency: config.enrich_concurrency,
        digest_concurrency: config.digest_concurrency,
        call_timeout: Duration::from_secs(config.call_timeout_secs),
        item_limit: None,
    });

    // Ctrl-C stops new work; in-flight items finish before the run ends.
    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    let report = pipeline.run(config.window_hours, config.top_n).await;
    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "run report"
    );
    Ok(report.success)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "runner failed to start");
            ExitCode::FAILURE
        }
    }
}
