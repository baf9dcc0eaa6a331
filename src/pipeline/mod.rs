//! End-to-end orchestration: ingest, enrich, digest, deliver, in order.
//!
//! Each stage is fail-closed at the stage level (a stage error aborts the
//! remaining stages) while stats gathered so far are retained in the report.
//! A cooperative shutdown flag is checked between stages and inside the
//! bounded worker loops.

pub mod deliver;
pub mod digest;
pub mod enrich;
pub mod ingest;

pub use deliver::DeliveryStats;
pub use digest::DigestStats;
pub use enrich::EnrichStats;
pub use ingest::IngestStats;

use crate::ai::{IntroGenerator, Ranker, Summarizer};
use crate::model::ContentKind;
use crate::notify::Notifier;
use crate::profile::UserProfile;
use crate::sources::ContentSource;
use crate::store::ContentStore;
use anyhow::{bail, Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

static METRICS_DESCRIBED: OnceCell<()> = OnceCell::new();

fn ensure_metrics_described() {
    METRICS_DESCRIBED.get_or_init(|| {
        describe_counter!("source_items_fetched_total", "Items fetched per source");
        describe_counter!("ingest_created_total", "New items created during ingest");
        describe_counter!("ingest_source_errors_total", "Source fetch failures during ingest");
        describe_counter!("enrich_processed_total", "Items enriched with secondary content");
        describe_counter!("enrich_unavailable_total", "Items marked unavailable during enrich");
        describe_counter!("digest_processed_total", "Digest records written");
        describe_counter!("digest_failed_total", "Items that failed summarization");
        describe_counter!("digest_emails_sent_total", "Digest emails delivered");
        describe_counter!("pipeline_runs_total", "Pipeline runs started");
        describe_counter!("pipeline_failures_total", "Pipeline runs that failed");
    });
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub enrich_concurrency: usize,
    pub digest_concurrency: usize,
    pub call_timeout: Duration,
    pub item_limit: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enrich_concurrency: 4,
            digest_concurrency: 4,
            call_timeout: Duration::from_secs(30),
            item_limit: None,
        }
    }
}

/// Summary of one pipeline run, serializable for the final log line.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub ingest: BTreeMap<ContentKind, IngestStats>,
    pub enrich: BTreeMap<ContentKind, EnrichStats>,
    pub digest: Option<DigestStats>,
    pub delivery: Option<DeliveryStats>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_secs: f64,
}

pub struct Pipeline {
    store: ContentStore,
    sources: Vec<Arc<dyn ContentSource>>,
    summarizer: Arc<dyn Summarizer>,
    ranker: Arc<dyn Ranker>,
    intro_gen: Arc<dyn IntroGenerator>,
    notifier: Arc<dyn Notifier>,
    profile: UserProfile,
    recipients: Vec<String>,
    opts: PipelineOptions,
    shutdown: Arc<AtomicBool>,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: ContentStore,
        sources: Vec<Arc<dyn ContentSource>>,
        summarizer: Arc<dyn Summarizer>,
        ranker: Arc<dyn Ranker>,
        intro_gen: Arc<dyn IntroGenerator>,
        notifier: Arc<dyn Notifier>,
        profile: UserProfile,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            store,
            sources,
            summarizer,
            ranker,
            intro_gen,
            notifier,
            profile,
            recipients,
            opts: PipelineOptions::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_options(mut self, opts: PipelineOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Flag shared with signal handlers; setting it stops new work while
    /// in-flight items finish.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    fn check_shutdown(&self, stage: &str) -> Result<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            bail!("shutdown requested before {stage} stage");
        }
        Ok(())
    }

    pub async fn run(&self, window_hours: i64, top_n: usize) -> RunReport {
        ensure_metrics_described();
        counter!("pipeline_runs_total").increment(1);

        let started = Instant::now();
        let mut report = RunReport::default();

        match self.run_stages(window_hours, top_n, &mut report).await {
            Ok(()) => report.success = true,
            Err(e) => {
                error!(error = format!("{e:#}"), "pipeline run failed");
                report.error = Some(format!("{e:#}"));
                counter!("pipeline_failures_total").increment(1);
            }
        }

        report.duration_secs = started.elapsed().as_secs_f64();
        info!(
            success = report.success,
            duration_secs = report.duration_secs,
            "pipeline run finished"
        );
        report
    }

    async fn run_stages(
        &self,
        window_hours: i64,
        top_n: usize,
        report: &mut RunReport,
    ) -> Result<()> {
        self.check_shutdown("ingest")?;
        report.ingest = ingest::run_ingest(
            &self.store,
            &self.sources,
            window_hours,
            self.opts.call_timeout,
        )
        .await
        .context("ingest stage")?;

        self.check_shutdown("enrich")?;
        for source in &self.sources {
            if !source.kind().requires_secondary() {
                continue;
            }
            let stats = enrich::run_enrich(
                &self.store,
                source.clone(),
                self.opts.enrich_concurrency,
                self.opts.call_timeout,
                self.opts.item_limit.map(|n| n as i64),
                &self.shutdown,
            )
            .await
            .context("enrich stage")?;
            // Sources may share a kind; their passes accumulate per kind.
            let entry = report.enrich.entry(source.kind()).or_default();
            entry.total += stats.total;
            entry.processed += stats.processed;
            entry.unavailable += stats.unavailable;
            entry.failed += stats.failed;
        }

        self.check_shutdown("digest")?;
        let digest_stats = digest::run_digest(
            &self.store,
            self.summarizer.clone(),
            self.opts.digest_concurrency,
            self.opts.call_timeout,
            self.opts.item_limit,
            &self.shutdown,
        )
        .await
        .context("digest stage")?;
        report.digest = Some(digest_stats);

        self.check_shutdown("delivery")?;
        let delivery = deliver::run_delivery(
            &self.store,
            self.ranker.clone(),
            self.intro_gen.clone(),
            self.notifier.clone(),
            &self.profile,
            &self.recipients,
            window_hours,
            top_n,
            self.opts.call_timeout,
        )
        .await
        .context("delivery stage")?;
        report.delivery = Some(delivery);

        Ok(())
    }
}
