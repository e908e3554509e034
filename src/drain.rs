//! Drain cycle: claim PENDING asset entries, run their strategy, record the
//! terminal status.
//!
//! PENDING → PROCESSING happens atomically in the store, so several workers
//! (tasks or processes) can drain the same queue. Handler runs are bounded by
//! a timeout; a timed-out run is recorded as ERROR. Nothing is retried here.

use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{CatalogRepository, ExecutionContext, StoreContext};
use crate::config::Config;
use crate::db::QueueStore;
use crate::dedup::DuplicateChecker;
use crate::dispatch::StrategyDispatcher;
use crate::error::SyncError;
use crate::media::HttpMediaClient;
use crate::model::{ActionResult, QueueEntry, QueueKind};
use crate::strategy::{HandlerOutcome, VideoStrategy};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DrainSummary {
    fn record(&mut self, result: ActionResult) {
        match result {
            ActionResult::Success => self.succeeded += 1,
            ActionResult::Skipped => self.skipped += 1,
            ActionResult::Error => self.failed += 1,
        }
    }

    fn merge(&mut self, other: DrainSummary) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

pub struct Drain {
    store: QueueStore,
    dispatcher: StrategyDispatcher,
    ctx: ExecutionContext,
    handler_timeout: Duration,
    workers: usize,
    poll_interval: Duration,
}

impl Drain {
    pub fn new(
        store: QueueStore,
        dispatcher: StrategyDispatcher,
        ctx: ExecutionContext,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            ctx,
            handler_timeout,
            workers: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Wire the video strategy to the HTTP media client and take worker
    /// count, poll interval and handler timeout from `cfg`.
    pub fn from_config(
        cfg: &Config,
        store: QueueStore,
        catalog: Arc<dyn CatalogRepository>,
        store_context: Arc<dyn StoreContext>,
    ) -> Result<Self> {
        let media = Arc::new(HttpMediaClient::from_config(cfg)?);
        let video = VideoStrategy::new(
            catalog,
            store_context,
            DuplicateChecker::new(store.clone()),
            media.clone(),
            media,
            cfg.youtube_api_key().map(str::to_string),
        );
        let dispatcher = StrategyDispatcher::new(Arc::new(video));
        Ok(Self {
            workers: cfg.app.workers.max(1),
            poll_interval: cfg.poll_interval(),
            ..Self::new(
                store,
                dispatcher,
                ExecutionContext::admin(),
                cfg.handler_timeout(),
            )
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Process one entry. `Ok(None)` when nothing is pending.
    #[instrument(skip_all, fields(worker_id = %worker_id))]
    pub async fn process_next_entry(&self, worker_id: &str) -> Result<Option<ActionResult>> {
        let Some(entry) = self.store.claim_next(QueueKind::Asset, worker_id).await? else {
            return Ok(None);
        };
        let id = entry
            .id
            .ok_or_else(|| anyhow!("claimed queue entry has no id"))?;

        let (outcome, message) = self.run_handler(&entry).await;
        let status = outcome.result.terminal_status();
        let recorded = self
            .store
            .complete(id, status, outcome.asset_id, message.as_deref())
            .await?;
        if !recorded {
            warn!(entry_id = id, "entry left PROCESSING before completion; status not recorded");
        }

        info!(
            entry_id = id,
            target_entity_id = %entry.target_entity_id,
            result = outcome.result.as_str(),
            status = status.as_str(),
            "queue entry processed"
        );
        Ok(Some(outcome.result))
    }

    async fn run_handler(&self, entry: &QueueEntry) -> (HandlerOutcome, Option<String>) {
        let strategy = match self.dispatcher.resolve(&entry.type_metadata) {
            Ok(strategy) => strategy,
            Err(SyncError::UnsupportedType(token)) => {
                warn!(entry_id = ?entry.id, type_metadata = %token, "no handler for asset type; skipping");
                return (HandlerOutcome::skipped(), None);
            }
            Err(err) => {
                error!(?err, entry_id = ?entry.id, "cannot route queue entry");
                return (HandlerOutcome::error(), Some(err.to_string()));
            }
        };

        match tokio::time::timeout(self.handler_timeout, strategy.execute(&self.ctx, Some(entry)))
            .await
        {
            Ok(Ok(outcome)) if outcome.result == ActionResult::Error => {
                (outcome, Some("handler reported ERROR".to_string()))
            }
            Ok(Ok(outcome)) => (outcome, None),
            Ok(Err(err)) => {
                error!(
                    ?err,
                    entry_id = ?entry.id,
                    target_entity_id = %entry.target_entity_id,
                    "handler failed"
                );
                (HandlerOutcome::error(), Some(err.to_string()))
            }
            Err(_) => {
                error!(
                    entry_id = ?entry.id,
                    timeout = ?self.handler_timeout,
                    "handler timed out"
                );
                (
                    HandlerOutcome::error(),
                    Some(format!("handler timed out after {:?}", self.handler_timeout)),
                )
            }
        }
    }

    /// Run `workers` concurrent drain loops until no PENDING asset entry is left.
    pub async fn drain_until_empty(&self, workers: usize) -> Result<DrainSummary> {
        let runs = (0..workers.max(1)).map(|_| async move {
            let worker_id = Uuid::new_v4().to_string();
            let mut summary = DrainSummary::default();
            while let Some(result) = self.process_next_entry(&worker_id).await? {
                summary.record(result);
            }
            Ok::<_, anyhow::Error>(summary)
        });

        let mut total = DrainSummary::default();
        for run in join_all(runs).await {
            total.merge(run?);
        }
        Ok(total)
    }

    /// Long-running worker: drain, then sleep `poll_interval` whenever idle.
    pub async fn run_worker(&self, poll_interval: Duration) {
        let worker_id = Uuid::new_v4().to_string();
        info!(%worker_id, "queue worker started");
        loop {
            match self.process_next_entry(&worker_id).await {
                Ok(Some(_)) => {}
                Ok(None) => tokio::time::sleep(poll_interval).await,
                Err(err) => {
                    error!(?err, "queue worker error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Run the configured number of workers. Never returns.
    pub async fn run(&self) {
        info!(
            workers = self.workers,
            poll_interval = ?self.poll_interval,
            handler_timeout = ?self.handler_timeout,
            "starting queue drain"
        );
        join_all((0..self.workers).map(|_| self.run_worker(self.poll_interval))).await;
    }
}
