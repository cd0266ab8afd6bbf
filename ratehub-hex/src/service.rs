//! Application services.
//!
//! Orchestrate domain operations through the repository and cache ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use ratehub_types::{
    AggregatedUsage, AppError, ConversionLogEntry, ConversionResponse, ConvertParams,
    CreateIntegrationRequest, CurrencyCode, CurrencyPair, DomainError, Freshness, HistoryParams,
    HistoryQuery, IntegrationFilter, IntegrationId, IntegrationResponse, IntegrationUpdate,
    IntegrationUsageResponse, LatestRate, LatestRateResponse, ListIntegrationsParams,
    ListRatesParams, NewIntegration, PopularPair, ProviderKind, RateCache, RateFilter,
    RateHistoryEntry, RateRepository, RequestLogEntry, RequestStats, UpdateIntegrationRequest,
    anchor_currencies, domain::validate_amount,
};

/// Default limit for historical rate queries.
const DEFAULT_HISTORY_LIMIT: i64 = 1000;

/// Default trailing windows for the usage views.
const DEFAULT_INTEGRATION_USAGE_DAYS: i64 = 30;
const DEFAULT_AGGREGATED_USAGE_DAYS: i64 = 7;
const DEFAULT_REQUEST_LOG_LIMIT: i64 = 100;
const DEFAULT_REQUEST_STATS_HOURS: i64 = 24;
const DEFAULT_CONVERSIONS_LIMIT: i64 = 50;
const DEFAULT_POPULAR_PAIRS_DAYS: i64 = 7;
const DEFAULT_POPULAR_PAIRS_LIMIT: i64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// RatesService - conversion engine and rate queries
// ─────────────────────────────────────────────────────────────────────────────

/// Answers conversions and rate queries.
///
/// Generic over `R: RateRepository`; the cache is a trait object because the
/// backend (Redis vs in-process LRU) is only known at startup.
pub struct RatesService<R: RateRepository> {
    repo: Arc<R>,
    cache: Arc<dyn RateCache>,
}

impl<R: RateRepository> RatesService<R> {
    /// Creates a rates service over the given store and cache.
    pub fn new(repo: Arc<R>, cache: Arc<dyn RateCache>) -> Self {
        Self { repo, cache }
    }

    /// Converts an amount between two currencies.
    ///
    /// Resolution order: same-currency identity, direct rate (cache then
    /// store), cross-rate through the anchor currencies. Direct results carry
    /// freshness metadata computed from the stored fetch time; cross-rates
    /// are computed at request time and therefore always fresh.
    #[tracing::instrument(skip(self))]
    pub async fn convert(&self, params: ConvertParams) -> Result<ConversionResponse, AppError> {
        let from = required_code(params.from.as_deref(), "from")?;
        let to = required_code(params.to.as_deref(), "to")?;
        let amount = params
            .amount
            .ok_or_else(|| AppError::BadRequest("amount is required".into()))?;
        validate_amount(amount)?;

        let now = Utc::now();

        // Identity conversion: no lookup, no logging.
        if from == to {
            return Ok(ConversionResponse {
                from,
                to,
                amount,
                result: amount,
                rate: 1.0,
                timestamp: now,
                data_age_minutes: None,
                data_age: None,
                stale: None,
                warning: None,
                via: None,
                cross_rate: None,
            });
        }

        let pair = CurrencyPair::new(from.clone(), to.clone());
        if let Some(direct) = self.lookup_direct(&pair).await? {
            let result = amount * direct.rate;
            let freshness = Freshness::compute(direct.fetched_at, now);
            self.log_conversion(from.clone(), to.clone(), amount, result, direct.rate);
            return Ok(ConversionResponse {
                from,
                to,
                amount,
                result,
                rate: direct.rate,
                timestamp: direct.fetched_at,
                data_age_minutes: Some(freshness.age_minutes),
                data_age: Some(freshness.age_label),
                stale: freshness.stale.then_some(true),
                warning: freshness.warning,
                via: None,
                cross_rate: None,
            });
        }

        if let Some((via, rate)) = self.lookup_cross(&from, &to).await? {
            let result = amount * rate;
            let freshness = Freshness::compute(now, now);
            self.log_conversion(from.clone(), to.clone(), amount, result, rate);
            return Ok(ConversionResponse {
                from,
                to,
                amount,
                result,
                rate,
                timestamp: now,
                data_age_minutes: Some(freshness.age_minutes),
                data_age: Some(freshness.age_label),
                stale: None,
                warning: None,
                via: Some(via),
                cross_rate: Some(true),
            });
        }

        Err(DomainError::RateUnavailable { pair: pair.key() }.into())
    }

    /// Lists latest rates. When both `base` and `target` are given the pair
    /// is answered cache-first; otherwise the store is queried with filters.
    #[tracing::instrument(skip(self))]
    pub async fn list_latest(
        &self,
        params: ListRatesParams,
    ) -> Result<Vec<LatestRateResponse>, AppError> {
        let base = optional_code(params.base.as_deref())?;
        let target = optional_code(params.target.as_deref())?;

        if let (Some(base), Some(target)) = (&base, &target) {
            let pair = CurrencyPair::new(base.clone(), target.clone());
            return Ok(self
                .lookup_direct(&pair)
                .await?
                .map(Into::into)
                .into_iter()
                .collect());
        }

        let filter = RateFilter {
            base,
            target,
            search: params.q.filter(|q| !q.trim().is_empty()),
        };
        let rates = self.repo.list_latest(filter).await?;
        Ok(rates.into_iter().map(Into::into).collect())
    }

    /// Historical rates for one pair, most recent first. Both end dates of
    /// the optional range are inclusive.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, params: HistoryParams) -> Result<Vec<RateHistoryEntry>, AppError> {
        let base = required_code(params.base.as_deref(), "base")?;
        let target = required_code(params.target.as_deref(), "target")?;
        let start_date = parse_date(params.start_date.as_deref(), "start_date")?;
        let end_date = parse_date(params.end_date.as_deref(), "end_date")?;
        let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1);

        self.repo
            .get_history(HistoryQuery {
                base,
                target,
                start_date,
                end_date,
                limit,
            })
            .await
            .map_err(Into::into)
    }

    /// Sorted union of every currency observed in the latest-rate table.
    pub async fn currencies(&self) -> Result<Vec<CurrencyCode>, AppError> {
        self.repo.list_currencies().await.map_err(Into::into)
    }

    /// Direct-rate lookup: cache first, then the store. Cache misses are
    /// silent; store failures surface.
    async fn lookup_direct(&self, pair: &CurrencyPair) -> Result<Option<LatestRate>, AppError> {
        if let Some(cached) = self.cache.get(pair).await {
            return Ok(Some(cached));
        }
        self.repo.get_latest(pair).await.map_err(Into::into)
    }

    /// Cross-rate search: the first anchor where both `anchor-from` and
    /// `anchor-to` exist in the store wins.
    async fn lookup_cross(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<(CurrencyCode, f64)>, AppError> {
        for anchor in anchor_currencies() {
            let leg_from = self
                .repo
                .get_latest(&CurrencyPair::new(anchor.clone(), from.clone()))
                .await?;
            let Some(leg_from) = leg_from else { continue };

            let leg_to = self
                .repo
                .get_latest(&CurrencyPair::new(anchor.clone(), to.clone()))
                .await?;
            let Some(leg_to) = leg_to else { continue };

            let rate = (1.0 / leg_from.rate) * leg_to.rate;
            tracing::debug!(via = %anchor, from = %from, to = %to, rate, "composed cross-rate");
            return Ok(Some((anchor, rate)));
        }
        Ok(None)
    }

    /// Appends a conversion log row on a detached task. A logging failure is
    /// warned about and swallowed; it never fails the conversion.
    fn log_conversion(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: f64,
        result: f64,
        rate: f64,
    ) {
        let repo = Arc::clone(&self.repo);
        tokio::spawn(async move {
            if let Err(e) = repo.log_conversion(&from, &to, amount, result, rate).await {
                tracing::warn!(error = %e, %from, %to, "failed to log conversion");
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntegrationService - provider integration management
// ─────────────────────────────────────────────────────────────────────────────

/// Manages the configured provider integrations.
pub struct IntegrationService<R: RateRepository> {
    repo: Arc<R>,
}

impl<R: RateRepository> IntegrationService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Creates an integration. The credential is encrypted by the store and
    /// never serialized back out.
    #[tracing::instrument(skip(self, req), fields(name = %req.name, provider = %req.provider))]
    pub async fn create(
        &self,
        req: CreateIntegrationRequest,
    ) -> Result<IntegrationResponse, AppError> {
        let data = NewIntegration::new(
            &req.name,
            &req.provider,
            &req.base_url,
            req.api_key,
            req.priority,
            req.poll_interval_seconds,
            req.active,
        )?;

        self.repo
            .create_integration(data)
            .await
            .map(Into::into)
            .map_err(Into::into)
    }

    /// Lists integrations, optionally filtered by active flag and provider.
    pub async fn list(
        &self,
        params: ListIntegrationsParams,
    ) -> Result<Vec<IntegrationResponse>, AppError> {
        let provider = params
            .provider
            .as_deref()
            .map(ProviderKind::parse)
            .transpose()?;
        let filter = IntegrationFilter {
            active: params.active,
            provider,
        };
        let integrations = self.repo.list_integrations(filter).await?;
        Ok(integrations.into_iter().map(Into::into).collect())
    }

    /// Gets a single integration by ID.
    pub async fn get(&self, id: IntegrationId) -> Result<IntegrationResponse, AppError> {
        self.repo
            .get_integration(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.map(Into::into)
                    .ok_or_else(|| AppError::NotFound(format!("Integration {id}")))
            })
    }

    /// Applies a partial update. An empty-string `api_key` clears the stored
    /// credential; a non-empty one is re-encrypted.
    #[tracing::instrument(skip(self, req), fields(integration_id = %id))]
    pub async fn update(
        &self,
        id: IntegrationId,
        req: UpdateIntegrationRequest,
    ) -> Result<IntegrationResponse, AppError> {
        let provider = req
            .provider
            .as_deref()
            .map(ProviderKind::parse)
            .transpose()?;
        let update = IntegrationUpdate {
            name: req.name,
            provider,
            base_url: req.base_url,
            api_key: req.api_key.map(|key| {
                let key = key.trim().to_string();
                (!key.is_empty()).then_some(key)
            }),
            priority: req.priority,
            poll_interval_seconds: req.poll_interval_seconds,
            active: req.active,
        };

        if update.is_empty() {
            return Err(AppError::BadRequest("no fields to update".into()));
        }
        update.validate()?;

        self.repo
            .update_integration(id, update)
            .await
            .map(Into::into)
            .map_err(Into::into)
    }

    /// Soft delete: the integration stays in the store but is never
    /// scheduled again.
    #[tracing::instrument(skip(self), fields(integration_id = %id))]
    pub async fn deactivate(&self, id: IntegrationId) -> Result<(), AppError> {
        self.repo.deactivate_integration(id).await.map_err(Into::into)
    }

    /// Hard delete: removes the row entirely.
    #[tracing::instrument(skip(self), fields(integration_id = %id))]
    pub async fn delete(&self, id: IntegrationId) -> Result<(), AppError> {
        self.repo.delete_integration(id).await.map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UsageService - usage and telemetry views
// ─────────────────────────────────────────────────────────────────────────────

/// Read side of the usage, request-log, and conversion-log tables.
pub struct UsageService<R: RateRepository> {
    repo: Arc<R>,
}

impl<R: RateRepository> UsageService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Usage rollup for one integration: today's row plus a daily history
    /// window (default 30 days).
    pub async fn integration_usage(
        &self,
        id: IntegrationId,
        days: Option<i64>,
    ) -> Result<IntegrationUsageResponse, AppError> {
        // 404 for unknown integrations rather than an empty rollup.
        if self.repo.get_integration(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Integration {id}")));
        }

        let days = days.unwrap_or(DEFAULT_INTEGRATION_USAGE_DAYS).max(1);
        let today = self.repo.today_usage(id).await?;
        let history = self.repo.usage_stats(id, days).await?;
        Ok(IntegrationUsageResponse { today, history })
    }

    /// Per-integration call totals and last errors over a trailing window
    /// (default 7 days). Integrations with no usage still appear with zero.
    pub async fn aggregated(&self, days: Option<i64>) -> Result<Vec<AggregatedUsage>, AppError> {
        let days = days.unwrap_or(DEFAULT_AGGREGATED_USAGE_DAYS).max(1);
        self.repo.aggregated_usage(days).await.map_err(Into::into)
    }

    /// Recent provider fetch outcomes, newest first (default limit 100).
    pub async fn recent_requests(
        &self,
        integration_id: Option<IntegrationId>,
        limit: Option<i64>,
    ) -> Result<Vec<RequestLogEntry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_REQUEST_LOG_LIMIT).max(1);
        self.repo
            .recent_requests(integration_id, limit)
            .await
            .map_err(Into::into)
    }

    /// Success/failure/latency rollup for one integration over a trailing
    /// window (default 24 hours).
    pub async fn request_stats(
        &self,
        id: IntegrationId,
        hours: Option<i64>,
    ) -> Result<RequestStats, AppError> {
        let hours = hours.unwrap_or(DEFAULT_REQUEST_STATS_HOURS).max(1);
        self.repo.request_stats(id, hours).await.map_err(Into::into)
    }

    /// Recently served conversions, newest first (default limit 50).
    pub async fn recent_conversions(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<ConversionLogEntry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_CONVERSIONS_LIMIT).max(1);
        self.repo.recent_conversions(limit).await.map_err(Into::into)
    }

    /// Most frequently converted pairs over a trailing window
    /// (defaults: 7 days, top 10).
    pub async fn popular_pairs(
        &self,
        days: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<PopularPair>, AppError> {
        let days = days.unwrap_or(DEFAULT_POPULAR_PAIRS_DAYS).max(1);
        let limit = limit.unwrap_or(DEFAULT_POPULAR_PAIRS_LIMIT).max(1);
        self.repo.popular_pairs(days, limit).await.map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameter helpers
// ─────────────────────────────────────────────────────────────────────────────

fn required_code(value: Option<&str>, field: &str) -> Result<CurrencyCode, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))?;
    CurrencyCode::parse(raw).map_err(Into::into)
}

fn optional_code(value: Option<&str>) -> Result<Option<CurrencyCode>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(CurrencyCode::parse(raw)?)),
        None => Ok(None),
    }
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{field} must be YYYY-MM-DD"))),
        None => Ok(None),
    }
}
