//! Polling scheduler.
//!
//! Owns one recurring fetch task per active integration. Every five minutes
//! (and after every management mutation) the live job table is reconciled
//! against the integrations store by a pure diff, so timers always reflect
//! configuration without restarts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use ratehub_providers::create_provider;
use ratehub_types::{
    AppError, BaseCurrencies, CurrencyCode, Integration, IntegrationId, LatestRate, RateCache,
    RateRepository, RateSnapshot, ScheduledJobInfo, SchedulerStatusResponse, UsageMetrics,
    anchor_currencies, ports::DEFAULT_RATE_TTL_SECONDS,
};

/// How often the job table is reconciled against the integrations store.
const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// A live binding between an active integration and its running timer task.
struct ScheduledJob {
    /// Snapshot taken at scheduling time; holds the decrypted credential.
    integration: Integration,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerInner {
    running: bool,
    jobs: HashMap<IntegrationId, ScheduledJob>,
    resync_task: Option<JoinHandle<()>>,
}

/// Drives periodic rate acquisition across every active integration.
///
/// All job-table mutation funnels through [`resync`](Self::resync) and
/// [`stop`](Self::stop) under one async mutex; ticks themselves run on
/// detached tasks and never take that lock.
pub struct PollingScheduler<R: RateRepository> {
    repo: Arc<R>,
    cache: Arc<dyn RateCache>,
    bases: BaseCurrencies,
    inner: Mutex<SchedulerInner>,
}

impl<R: RateRepository> PollingScheduler<R> {
    pub fn new(repo: Arc<R>, cache: Arc<dyn RateCache>, bases: BaseCurrencies) -> Self {
        Self {
            repo,
            cache,
            bases,
            inner: Mutex::new(SchedulerInner::default()),
        }
    }

    /// Starts the scheduler: seeds the job table from the active
    /// integrations, then arms the fixed resync timer. Idempotent.
    ///
    /// A failing initial resync is logged and left to the timer to retry.
    pub async fn start(self: Arc<Self>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.running {
                return;
            }
            inner.running = true;
        }
        info!("Starting polling scheduler");

        if let Err(e) = self.resync().await {
            error!(error = %e, "Initial scheduler resync failed");
        }

        let scheduler = Arc::downgrade(&self);
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(RESYNC_INTERVAL);
            // interval fires immediately; the initial resync already ran
            timer.tick().await;
            loop {
                timer.tick().await;
                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                if let Err(e) = scheduler.resync().await {
                    error!(error = %e, "Scheduled resync failed");
                }
            }
        });

        let mut inner = self.inner.lock().await;
        if inner.running {
            inner.resync_task = Some(handle);
        } else {
            // stop() won the race while the initial resync was in flight
            handle.abort();
        }
    }

    /// Cancels the resync timer and every job timer and clears the job
    /// table. Idempotent.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return;
        }
        inner.running = false;
        if let Some(task) = inner.resync_task.take() {
            task.abort();
        }
        let stopped = inner.jobs.len();
        for (_, job) in inner.jobs.drain() {
            job.handle.abort();
        }
        info!(jobs = stopped, "Polling scheduler stopped");
    }

    /// Reconciles the live job table with the active integrations.
    ///
    /// Removes jobs whose integration vanished or deactivated, creates jobs
    /// for new integrations, and replaces jobs whose poll interval changed.
    /// A store failure leaves the current job set untouched; a stopped
    /// scheduler treats this as a no-op.
    #[instrument(skip(self))]
    pub async fn resync(&self) -> Result<(), AppError> {
        let desired = self.repo.list_active_integrations().await?;

        let mut inner = self.inner.lock().await;
        if !inner.running {
            return Ok(());
        }

        let current: HashMap<IntegrationId, i64> = inner
            .jobs
            .iter()
            .map(|(id, job)| (*id, job.integration.poll_interval_seconds))
            .collect();
        let diff = compute_diff(&desired, &current);

        for id in &diff.remove {
            if let Some(job) = inner.jobs.remove(id) {
                info!(integration_id = %id, name = %job.integration.name, "Unscheduled integration");
                job.handle.abort();
            }
        }
        for integration in diff.recreate {
            if let Some(job) = inner.jobs.remove(&integration.id) {
                info!(
                    integration_id = %integration.id,
                    old_interval = job.integration.poll_interval_seconds,
                    new_interval = integration.poll_interval_seconds,
                    "Rescheduling integration with changed interval"
                );
                job.handle.abort();
            }
            let job = self.spawn_job(integration);
            inner.jobs.insert(job.integration.id, job);
        }
        for integration in diff.create {
            info!(
                integration_id = %integration.id,
                name = %integration.name,
                interval_seconds = integration.poll_interval_seconds,
                "Scheduled integration"
            );
            let job = self.spawn_job(integration);
            inner.jobs.insert(job.integration.id, job);
        }

        Ok(())
    }

    /// Runs one integration's tick right now, without disturbing its timer.
    /// Fails when the integration is not currently scheduled.
    #[instrument(skip(self), fields(integration_id = %id))]
    pub async fn trigger(&self, id: IntegrationId) -> Result<(), AppError> {
        let integration = {
            let inner = self.inner.lock().await;
            inner
                .jobs
                .get(&id)
                .map(|job| job.integration.clone())
                .ok_or_else(|| AppError::NotFound(format!("Integration {id} is not scheduled")))?
        };

        info!(name = %integration.name, "Manual fetch triggered");
        run_tick(self.repo.as_ref(), self.cache.as_ref(), &self.bases, &integration).await;
        Ok(())
    }

    /// Scheduler state for the monitoring surface. Jobs are sorted by name
    /// so the listing is stable.
    pub async fn status(&self) -> SchedulerStatusResponse {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<ScheduledJobInfo> = inner
            .jobs
            .values()
            .map(|job| ScheduledJobInfo {
                id: job.integration.id,
                name: job.integration.name.clone(),
                provider: job.integration.provider,
                interval_seconds: job.integration.poll_interval_seconds,
            })
            .collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));

        SchedulerStatusResponse {
            running: inner.running,
            active_jobs: jobs.len(),
            jobs,
        }
    }

    /// Spawns the recurring fetch task for one integration. The first tick
    /// fires immediately, then every poll interval.
    fn spawn_job(&self, integration: Integration) -> ScheduledJob {
        let repo = Arc::clone(&self.repo);
        let cache = Arc::clone(&self.cache);
        let bases = self.bases.clone();
        let job_integration = integration.clone();

        let handle = tokio::spawn(async move {
            let every = Duration::from_secs(job_integration.poll_interval_seconds as u64);
            let mut timer = tokio::time::interval(every);
            loop {
                timer.tick().await;
                run_tick(repo.as_ref(), cache.as_ref(), &bases, &job_integration).await;
            }
        });

        ScheduledJob {
            integration,
            handle,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────────────────

/// What a resync must do to converge the job table.
#[derive(Debug, Default)]
pub(crate) struct JobDiff {
    pub create: Vec<Integration>,
    pub remove: Vec<IntegrationId>,
    pub recreate: Vec<Integration>,
}

/// Diffs the desired active integrations against the currently scheduled
/// jobs (id -> interval). A job is recreated only when its interval
/// diverged; other field changes take effect on the natural recreate.
pub(crate) fn compute_diff(
    desired: &[Integration],
    current: &HashMap<IntegrationId, i64>,
) -> JobDiff {
    let mut diff = JobDiff::default();
    let desired_ids: HashSet<IntegrationId> = desired.iter().map(|i| i.id).collect();

    for integration in desired {
        match current.get(&integration.id) {
            None => diff.create.push(integration.clone()),
            Some(interval) if *interval != integration.poll_interval_seconds => {
                diff.recreate.push(integration.clone());
            }
            Some(_) => {}
        }
    }
    for id in current.keys() {
        if !desired_ids.contains(id) {
            diff.remove.push(*id);
        }
    }

    diff
}

// ─────────────────────────────────────────────────────────────────────────────
// Tick execution
// ─────────────────────────────────────────────────────────────────────────────

/// One fetch-and-store pass for one integration.
///
/// Never fails: provider and storage errors are logged, written to the
/// request log, and the pass moves on to the next base currency. Shared by
/// the recurring job tasks and manual triggers.
pub(crate) async fn run_tick<R: RateRepository>(
    repo: &R,
    cache: &dyn RateCache,
    bases: &BaseCurrencies,
    integration: &Integration,
) {
    let provider = create_provider(integration);
    let bases = resolve_bases(repo, bases).await;
    let id = integration.id;

    let mut calls_made: i64 = 0;
    for base in &bases {
        calls_made += 1;
        let started = Instant::now();
        match provider.fetch_latest_rates(base).await {
            Ok(snapshot) => {
                let elapsed_ms = started.elapsed().as_millis() as i64;
                let stored = store_snapshot(repo, cache, id, &snapshot).await;
                debug!(
                    integration_id = %id,
                    base = %base,
                    pairs = stored,
                    elapsed_ms,
                    "Stored rate snapshot"
                );
                if let Err(e) = repo.log_request(id, true, Some(elapsed_ms), None).await {
                    warn!(integration_id = %id, error = %e, "Failed to write request log");
                }
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as i64;
                error!(integration_id = %id, base = %base, error = %e, "Provider fetch failed");
                let message = e.to_string();
                if let Err(e) = repo
                    .log_request(id, false, Some(elapsed_ms), Some(&message))
                    .await
                {
                    warn!(integration_id = %id, error = %e, "Failed to write request log");
                }
                if let Err(e) = repo.record_usage_error(id, &message).await {
                    warn!(integration_id = %id, error = %e, "Failed to record usage error");
                }
            }
        }
    }

    let metrics = provider.usage_metrics().await;
    if let Err(e) = repo.record_usage(id, calls_made, &metrics).await {
        warn!(integration_id = %id, error = %e, "Failed to record usage");
    }
    warn_on_quota(repo, integration, &metrics).await;
}

/// The base currencies a tick fetches. `All` expands to every currency
/// observed in the store, falling back to the anchors when the store is
/// empty or unreadable.
async fn resolve_bases<R: RateRepository>(repo: &R, bases: &BaseCurrencies) -> Vec<CurrencyCode> {
    match bases {
        BaseCurrencies::List(list) => list.clone(),
        BaseCurrencies::All => match repo.list_currencies().await {
            Ok(observed) if !observed.is_empty() => observed,
            Ok(_) => anchor_currencies().to_vec(),
            Err(e) => {
                warn!(error = %e, "Could not list observed currencies, using anchors");
                anchor_currencies().to_vec()
            }
        },
    }
}

/// Fans a snapshot out into latest rows, history rows, and the cache.
/// Returns how many pairs were stored; per-pair storage failures are logged
/// and skipped so one bad row never drops the rest of the snapshot.
async fn store_snapshot<R: RateRepository>(
    repo: &R,
    cache: &dyn RateCache,
    source: IntegrationId,
    snapshot: &RateSnapshot,
) -> usize {
    let ttl = Duration::from_secs(DEFAULT_RATE_TTL_SECONDS);
    let mut stored = 0;
    for (target, rate) in &snapshot.rates {
        let row = LatestRate {
            base: snapshot.base.clone(),
            target: target.clone(),
            rate: *rate,
            fetched_at: snapshot.fetched_at,
            source_integration_id: Some(source),
        };
        if let Err(e) = repo.upsert_latest(&row).await {
            warn!(pair = %row.pair().key(), error = %e, "Failed to upsert latest rate");
            continue;
        }
        if let Err(e) = repo.append_history(&row).await {
            warn!(pair = %row.pair().key(), error = %e, "Failed to append rate history");
        }
        cache.set(&row, ttl).await;
        stored += 1;
    }
    stored
}

/// Warns when estimated quota consumption reaches 90% of the provider's
/// stated limit. Providers that report no remaining count are estimated
/// from today's recorded calls.
async fn warn_on_quota<R: RateRepository>(
    repo: &R,
    integration: &Integration,
    metrics: &UsageMetrics,
) {
    let Some(limit) = metrics.limit.filter(|l| *l > 0) else {
        return;
    };
    let consumed = match metrics.calls_remaining {
        Some(remaining) => limit - remaining,
        None => match repo.today_usage(integration.id).await {
            Ok(Some(usage)) => usage.calls_made,
            _ => return,
        },
    };
    if consumed * 10 >= limit * 9 {
        warn!(
            integration_id = %integration.id,
            name = %integration.name,
            consumed,
            limit,
            "Integration is approaching its provider quota"
        );
    }
}
