//! Application service unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, Utc};

    use ratehub_types::{
        AggregatedUsage, AppError, ConversionLogEntry, ConvertParams, CreateIntegrationRequest,
        CurrencyCode, CurrencyPair, HistoryParams, HistoryQuery, Integration, IntegrationFilter,
        IntegrationId, IntegrationUpdate, LatestRate, ListIntegrationsParams, ListRatesParams,
        NewIntegration, PopularPair, RateCache, RateFilter, RateHistoryEntry, RateRepository,
        RepoError, RequestLogEntry, RequestStats, UpdateIntegrationRequest, UsageMetrics,
        UsageRecord,
    };

    use crate::{IntegrationService, RatesService, UsageService};

    /// In-memory repository for testing the service and scheduler layers.
    pub(crate) struct MockRepo {
        integrations: Mutex<HashMap<IntegrationId, Integration>>,
        latest: Mutex<HashMap<String, LatestRate>>,
        history: Mutex<Vec<LatestRate>>,
        usage: Mutex<HashMap<(IntegrationId, NaiveDate), UsageRecord>>,
        requests: Mutex<Vec<RequestLogEntry>>,
        conversions: Mutex<Vec<ConversionLogEntry>>,
    }

    impl MockRepo {
        pub(crate) fn new() -> Self {
            Self {
                integrations: Mutex::new(HashMap::new()),
                latest: Mutex::new(HashMap::new()),
                history: Mutex::new(Vec::new()),
                usage: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
                conversions: Mutex::new(Vec::new()),
            }
        }

        /// Seeds a latest rate directly into the store.
        pub(crate) fn seed_rate(
            &self,
            base: &str,
            target: &str,
            rate: f64,
            fetched_at: chrono::DateTime<Utc>,
        ) {
            let row = latest(base, target, rate, fetched_at);
            self.latest.lock().unwrap().insert(row.pair().key(), row);
        }
    }

    #[async_trait]
    impl RateRepository for MockRepo {
        async fn create_integration(
            &self,
            data: NewIntegration,
        ) -> Result<Integration, RepoError> {
            let now = Utc::now();
            let integration = Integration::from_parts(
                IntegrationId::new(),
                data.name,
                data.provider,
                data.base_url,
                data.api_key,
                data.priority,
                data.poll_interval_seconds,
                data.active,
                now,
                now,
            );
            self.integrations
                .lock()
                .unwrap()
                .insert(integration.id, integration.clone());
            Ok(integration)
        }

        async fn get_integration(
            &self,
            id: IntegrationId,
        ) -> Result<Option<Integration>, RepoError> {
            Ok(self.integrations.lock().unwrap().get(&id).cloned())
        }

        async fn list_integrations(
            &self,
            filter: IntegrationFilter,
        ) -> Result<Vec<Integration>, RepoError> {
            let mut rows: Vec<Integration> = self
                .integrations
                .lock()
                .unwrap()
                .values()
                .filter(|i| filter.active.is_none_or(|a| i.active == a))
                .filter(|i| filter.provider.is_none_or(|p| i.provider == p))
                .cloned()
                .map(|mut i| {
                    i.api_key = None;
                    i
                })
                .collect();
            rows.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.created_at.cmp(&a.created_at))
            });
            Ok(rows)
        }

        async fn update_integration(
            &self,
            id: IntegrationId,
            update: IntegrationUpdate,
        ) -> Result<Integration, RepoError> {
            update.validate()?;
            let mut integrations = self.integrations.lock().unwrap();
            let integration = integrations.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(name) = update.name {
                integration.name = name;
            }
            if let Some(provider) = update.provider {
                integration.provider = provider;
            }
            if let Some(base_url) = update.base_url {
                integration.base_url = base_url;
            }
            if let Some(api_key) = update.api_key {
                integration.api_key = api_key;
            }
            if let Some(priority) = update.priority {
                integration.priority = priority;
            }
            if let Some(seconds) = update.poll_interval_seconds {
                integration.poll_interval_seconds = seconds;
            }
            if let Some(active) = update.active {
                integration.active = active;
            }
            integration.updated_at = Utc::now();
            Ok(integration.clone())
        }

        async fn deactivate_integration(&self, id: IntegrationId) -> Result<(), RepoError> {
            let mut integrations = self.integrations.lock().unwrap();
            let integration = integrations.get_mut(&id).ok_or(RepoError::NotFound)?;
            integration.active = false;
            Ok(())
        }

        async fn delete_integration(&self, id: IntegrationId) -> Result<(), RepoError> {
            self.integrations
                .lock()
                .unwrap()
                .remove(&id)
                .map(|_| ())
                .ok_or(RepoError::NotFound)
        }

        async fn list_active_integrations(&self) -> Result<Vec<Integration>, RepoError> {
            Ok(self
                .integrations
                .lock()
                .unwrap()
                .values()
                .filter(|i| i.active)
                .cloned()
                .collect())
        }

        async fn upsert_latest(&self, rate: &LatestRate) -> Result<(), RepoError> {
            self.latest
                .lock()
                .unwrap()
                .insert(rate.pair().key(), rate.clone());
            Ok(())
        }

        async fn append_history(&self, rate: &LatestRate) -> Result<(), RepoError> {
            self.history.lock().unwrap().push(rate.clone());
            Ok(())
        }

        async fn get_latest(&self, pair: &CurrencyPair) -> Result<Option<LatestRate>, RepoError> {
            Ok(self.latest.lock().unwrap().get(&pair.key()).cloned())
        }

        async fn list_latest(&self, filter: RateFilter) -> Result<Vec<LatestRate>, RepoError> {
            let mut rows: Vec<LatestRate> = self
                .latest
                .lock()
                .unwrap()
                .values()
                .filter(|r| filter.base.as_ref().is_none_or(|b| &r.base == b))
                .filter(|r| filter.target.as_ref().is_none_or(|t| &r.target == t))
                .filter(|r| {
                    filter
                        .search
                        .as_ref()
                        .is_none_or(|q| r.pair().key().contains(&q.to_uppercase()))
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
            rows.truncate(100);
            Ok(rows)
        }

        async fn get_history(
            &self,
            query: HistoryQuery,
        ) -> Result<Vec<RateHistoryEntry>, RepoError> {
            let mut rows: Vec<RateHistoryEntry> = self
                .history
                .lock()
                .unwrap()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.base == query.base && r.target == query.target)
                .filter(|(_, r)| {
                    query
                        .start_date
                        .is_none_or(|d| r.fetched_at.date_naive() >= d)
                })
                .filter(|(_, r)| query.end_date.is_none_or(|d| r.fetched_at.date_naive() <= d))
                .map(|(i, r)| RateHistoryEntry {
                    id: i as i64 + 1,
                    base: r.base.clone(),
                    target: r.target.clone(),
                    rate: r.rate,
                    fetched_at: r.fetched_at,
                    source_integration_id: r.source_integration_id,
                })
                .collect();
            rows.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
            rows.truncate(query.limit as usize);
            Ok(rows)
        }

        async fn list_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError> {
            let mut codes: Vec<CurrencyCode> = self
                .latest
                .lock()
                .unwrap()
                .values()
                .flat_map(|r| [r.base.clone(), r.target.clone()])
                .collect();
            codes.sort();
            codes.dedup();
            Ok(codes)
        }

        async fn record_usage(
            &self,
            integration_id: IntegrationId,
            calls_made: i64,
            metrics: &UsageMetrics,
        ) -> Result<(), RepoError> {
            let today = Utc::now().date_naive();
            let mut usage = self.usage.lock().unwrap();
            let record = usage
                .entry((integration_id, today))
                .or_insert_with(|| UsageRecord {
                    integration_id,
                    date: today,
                    calls_made: 0,
                    calls_limit: None,
                    calls_remaining: None,
                    reset_at: None,
                    last_error: None,
                    last_error_at: None,
                });
            record.calls_made += calls_made;
            record.calls_limit = metrics.limit.or(record.calls_limit);
            record.calls_remaining = metrics.calls_remaining.or(record.calls_remaining);
            record.reset_at = metrics.reset_at.or(record.reset_at);
            Ok(())
        }

        async fn record_usage_error(
            &self,
            integration_id: IntegrationId,
            message: &str,
        ) -> Result<(), RepoError> {
            let today = Utc::now().date_naive();
            let mut usage = self.usage.lock().unwrap();
            let record = usage
                .entry((integration_id, today))
                .or_insert_with(|| UsageRecord {
                    integration_id,
                    date: today,
                    calls_made: 0,
                    calls_limit: None,
                    calls_remaining: None,
                    reset_at: None,
                    last_error: None,
                    last_error_at: None,
                });
            record.last_error = Some(message.to_string());
            record.last_error_at = Some(Utc::now());
            Ok(())
        }

        async fn usage_stats(
            &self,
            integration_id: IntegrationId,
            days: i64,
        ) -> Result<Vec<UsageRecord>, RepoError> {
            let cutoff = Utc::now().date_naive() - Duration::days(days);
            let mut rows: Vec<UsageRecord> = self
                .usage
                .lock()
                .unwrap()
                .values()
                .filter(|u| u.integration_id == integration_id && u.date >= cutoff)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(rows)
        }

        async fn today_usage(
            &self,
            integration_id: IntegrationId,
        ) -> Result<Option<UsageRecord>, RepoError> {
            let today = Utc::now().date_naive();
            Ok(self
                .usage
                .lock()
                .unwrap()
                .get(&(integration_id, today))
                .cloned())
        }

        async fn aggregated_usage(&self, days: i64) -> Result<Vec<AggregatedUsage>, RepoError> {
            let cutoff = Utc::now().date_naive() - Duration::days(days);
            let usage = self.usage.lock().unwrap();
            Ok(self
                .integrations
                .lock()
                .unwrap()
                .values()
                .map(|i| {
                    let total_calls = usage
                        .values()
                        .filter(|u| u.integration_id == i.id && u.date >= cutoff)
                        .map(|u| u.calls_made)
                        .sum();
                    AggregatedUsage {
                        id: i.id,
                        name: i.name.clone(),
                        provider: i.provider,
                        active: i.active,
                        total_calls,
                        last_error: None,
                        last_error_at: None,
                    }
                })
                .collect())
        }

        async fn log_request(
            &self,
            integration_id: IntegrationId,
            success: bool,
            response_time_ms: Option<i64>,
            error_message: Option<&str>,
        ) -> Result<(), RepoError> {
            let mut requests = self.requests.lock().unwrap();
            let id = requests.len() as i64 + 1;
            requests.push(RequestLogEntry {
                id,
                integration_id,
                success,
                response_time_ms,
                error_message: error_message.map(str::to_string),
                created_at: Utc::now(),
            });
            Ok(())
        }

        async fn recent_requests(
            &self,
            integration_id: Option<IntegrationId>,
            limit: i64,
        ) -> Result<Vec<RequestLogEntry>, RepoError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|r| integration_id.is_none_or(|id| r.integration_id == id))
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn request_stats(
            &self,
            integration_id: IntegrationId,
            hours: i64,
        ) -> Result<RequestStats, RepoError> {
            let cutoff = Utc::now() - Duration::hours(hours);
            let requests = self.requests.lock().unwrap();
            let window: Vec<&RequestLogEntry> = requests
                .iter()
                .filter(|r| r.integration_id == integration_id && r.created_at >= cutoff)
                .collect();
            let total = window.len() as i64;
            let successes = window.iter().filter(|r| r.success).count() as i64;
            let times: Vec<i64> = window.iter().filter_map(|r| r.response_time_ms).collect();
            let avg_response_ms = if times.is_empty() {
                None
            } else {
                Some(times.iter().sum::<i64>() as f64 / times.len() as f64)
            };
            Ok(RequestStats {
                total,
                successes,
                failures: total - successes,
                avg_response_ms,
            })
        }

        async fn log_conversion(
            &self,
            from: &CurrencyCode,
            to: &CurrencyCode,
            amount: f64,
            result: f64,
            rate: f64,
        ) -> Result<(), RepoError> {
            let mut conversions = self.conversions.lock().unwrap();
            let id = conversions.len() as i64 + 1;
            conversions.push(ConversionLogEntry {
                id,
                from_currency: from.clone(),
                to_currency: to.clone(),
                amount,
                result,
                rate,
                created_at: Utc::now(),
            });
            Ok(())
        }

        async fn recent_conversions(
            &self,
            limit: i64,
        ) -> Result<Vec<ConversionLogEntry>, RepoError> {
            Ok(self
                .conversions
                .lock()
                .unwrap()
                .iter()
                .rev()
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn popular_pairs(
            &self,
            _days: i64,
            limit: i64,
        ) -> Result<Vec<PopularPair>, RepoError> {
            let conversions = self.conversions.lock().unwrap();
            let mut counts: HashMap<(CurrencyCode, CurrencyCode), i64> = HashMap::new();
            for c in conversions.iter() {
                *counts
                    .entry((c.from_currency.clone(), c.to_currency.clone()))
                    .or_default() += 1;
            }
            let mut pairs: Vec<PopularPair> = counts
                .into_iter()
                .map(|((from_currency, to_currency), conversions)| PopularPair {
                    from_currency,
                    to_currency,
                    conversions,
                })
                .collect();
            pairs.sort_by(|a, b| b.conversions.cmp(&a.conversions));
            pairs.truncate(limit as usize);
            Ok(pairs)
        }
    }

    /// In-memory cache for testing; no TTL handling.
    pub(crate) struct MockCache {
        entries: Mutex<HashMap<String, LatestRate>>,
    }

    impl MockCache {
        pub(crate) fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl RateCache for MockCache {
        async fn get(&self, pair: &CurrencyPair) -> Option<LatestRate> {
            self.entries.lock().unwrap().get(&pair.key()).cloned()
        }

        async fn set(&self, rate: &LatestRate, _ttl: StdDuration) {
            self.entries
                .lock()
                .unwrap()
                .insert(rate.pair().key(), rate.clone());
        }

        async fn invalidate(&self, pair: &CurrencyPair) {
            self.entries.lock().unwrap().remove(&pair.key());
        }

        async fn invalidate_all(&self) {
            self.entries.lock().unwrap().clear();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    pub(crate) fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    pub(crate) fn pair(base: &str, target: &str) -> CurrencyPair {
        CurrencyPair::new(code(base), code(target))
    }

    pub(crate) fn latest(
        base: &str,
        target: &str,
        rate: f64,
        fetched_at: chrono::DateTime<Utc>,
    ) -> LatestRate {
        LatestRate {
            base: code(base),
            target: code(target),
            rate,
            fetched_at,
            source_integration_id: None,
        }
    }

    fn rates_service() -> (Arc<MockRepo>, Arc<MockCache>, RatesService<MockRepo>) {
        let repo = Arc::new(MockRepo::new());
        let cache = Arc::new(MockCache::new());
        let service = RatesService::new(repo.clone(), cache.clone());
        (repo, cache, service)
    }

    fn convert_params(from: &str, to: &str, amount: f64) -> ConvertParams {
        ConvertParams {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount: Some(amount),
        }
    }

    fn create_request(name: &str, provider: &str) -> CreateIntegrationRequest {
        CreateIntegrationRequest {
            name: name.to_string(),
            provider: provider.to_string(),
            base_url: "http://localhost".to_string(),
            api_key: None,
            priority: None,
            poll_interval_seconds: None,
            active: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_convert_same_currency_identity() {
        let (repo, _, service) = rates_service();

        let result = service
            .convert(convert_params("usd", "USD", 42.5))
            .await
            .unwrap();

        assert_eq!(result.rate, 1.0);
        assert_eq!(result.result, 42.5);
        assert!(result.data_age_minutes.is_none());
        assert!(result.data_age.is_none());
        assert!(result.via.is_none());
        assert!(result.cross_rate.is_none());

        // Identity conversions are not logged
        tokio::task::yield_now().await;
        assert!(repo.recent_conversions(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_direct_from_store() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now());

        let result = service
            .convert(convert_params("USD", "EUR", 100.0))
            .await
            .unwrap();

        assert_eq!(result.rate, 0.92);
        assert!((result.result - 92.0).abs() < 1e-9);
        assert_eq!(result.data_age.as_deref(), Some("just now"));
        assert_eq!(result.data_age_minutes, Some(0));
        assert!(result.stale.is_none());
        assert!(result.via.is_none());
    }

    #[tokio::test]
    async fn test_convert_prefers_cached_rate() {
        let (repo, cache, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now());
        cache
            .set(&latest("USD", "EUR", 0.90, Utc::now()), StdDuration::from_secs(60))
            .await;

        let result = service
            .convert(convert_params("USD", "EUR", 100.0))
            .await
            .unwrap();

        assert_eq!(result.rate, 0.90);
    }

    #[tokio::test]
    async fn test_convert_cross_rate_through_usd() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "THB", 35.0, Utc::now());
        repo.seed_rate("USD", "EUR", 0.90, Utc::now());

        let result = service
            .convert(convert_params("THB", "EUR", 350.0))
            .await
            .unwrap();

        assert!((result.rate - 0.90 / 35.0).abs() < 1e-9);
        assert!((result.result - 9.0).abs() < 1e-9);
        assert_eq!(result.via, Some(code("USD")));
        assert_eq!(result.cross_rate, Some(true));
        // Cross-rates are computed now, so they are never stale
        assert_eq!(result.data_age.as_deref(), Some("just now"));
        assert!(result.stale.is_none());
        assert!(result.warning.is_none());
    }

    #[tokio::test]
    async fn test_cross_rate_uses_first_anchor_with_both_legs() {
        let (repo, _, service) = rates_service();
        // Both USD and EUR could bridge CAD->CHF; USD is first in anchor order
        repo.seed_rate("USD", "CAD", 1.36, Utc::now());
        repo.seed_rate("USD", "CHF", 0.88, Utc::now());
        repo.seed_rate("EUR", "CAD", 1.48, Utc::now());
        repo.seed_rate("EUR", "CHF", 0.96, Utc::now());

        let result = service
            .convert(convert_params("CAD", "CHF", 10.0))
            .await
            .unwrap();

        assert_eq!(result.via, Some(code("USD")));
        assert!((result.rate - 0.88 / 1.36).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cross_rate_skips_anchor_missing_a_leg() {
        let (repo, _, service) = rates_service();
        // USD only quotes CAD; EUR quotes both legs
        repo.seed_rate("USD", "CAD", 1.36, Utc::now());
        repo.seed_rate("EUR", "CAD", 1.48, Utc::now());
        repo.seed_rate("EUR", "CHF", 0.96, Utc::now());

        let result = service
            .convert(convert_params("CAD", "CHF", 10.0))
            .await
            .unwrap();

        assert_eq!(result.via, Some(code("EUR")));
        assert!((result.rate - 0.96 / 1.48).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_convert_unavailable_pair_names_it() {
        let (_, _, service) = rates_service();

        let result = service.convert(convert_params("ABC", "XYZ", 1.0)).await;

        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("ABC-XYZ")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_convert_rejects_invalid_input() {
        let (_, _, service) = rates_service();

        let missing_amount = service
            .convert(ConvertParams {
                from: Some("USD".into()),
                to: Some("EUR".into()),
                amount: None,
            })
            .await;
        assert!(matches!(missing_amount, Err(AppError::BadRequest(_))));

        let bad_code = service.convert(convert_params("EURO", "USD", 1.0)).await;
        assert!(matches!(bad_code, Err(AppError::BadRequest(_))));

        let zero = service.convert(convert_params("USD", "EUR", 0.0)).await;
        assert!(matches!(zero, Err(AppError::BadRequest(_))));

        let negative = service.convert(convert_params("USD", "EUR", -5.0)).await;
        assert!(matches!(negative, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_convert_stale_annotation_past_one_hour() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now() - Duration::minutes(61));

        let result = service
            .convert(convert_params("USD", "EUR", 10.0))
            .await
            .unwrap();

        assert_eq!(result.stale, Some(true));
        assert!(result.warning.is_some());
        assert_eq!(result.data_age.as_deref(), Some("1 hour ago"));
    }

    #[tokio::test]
    async fn test_convert_fresh_under_one_hour() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now() - Duration::minutes(59));

        let result = service
            .convert(convert_params("USD", "EUR", 10.0))
            .await
            .unwrap();

        assert!(result.stale.is_none());
        assert!(result.warning.is_none());
        assert_eq!(result.data_age.as_deref(), Some("59 minutes ago"));
    }

    #[tokio::test]
    async fn test_convert_logs_conversion() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now());

        service
            .convert(convert_params("USD", "EUR", 100.0))
            .await
            .unwrap();

        // The log write is a detached task; let it run
        tokio::task::yield_now().await;

        let logged = repo.recent_conversions(10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].from_currency, code("USD"));
        assert_eq!(logged[0].to_currency, code("EUR"));
        assert!((logged[0].result - 92.0).abs() < 1e-9);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rate queries
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_list_latest_pair_is_cache_first() {
        let (repo, cache, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now());
        cache
            .set(&latest("USD", "EUR", 0.90, Utc::now()), StdDuration::from_secs(60))
            .await;

        let rows = service
            .list_latest(ListRatesParams {
                base: Some("USD".into()),
                target: Some("EUR".into()),
                q: None,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rate, 0.90);
        assert_eq!(rows[0].pair, "USD-EUR");
    }

    #[tokio::test]
    async fn test_list_latest_unknown_pair_is_empty() {
        let (_, _, service) = rates_service();

        let rows = service
            .list_latest(ListRatesParams {
                base: Some("USD".into()),
                target: Some("EUR".into()),
                q: None,
            })
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_latest_filters() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "EUR", 0.92, Utc::now());
        repo.seed_rate("USD", "THB", 35.0, Utc::now());
        repo.seed_rate("EUR", "THB", 38.0, Utc::now());

        let usd_rows = service
            .list_latest(ListRatesParams {
                base: Some("usd".into()),
                target: None,
                q: None,
            })
            .await
            .unwrap();
        assert_eq!(usd_rows.len(), 2);

        let thb_rows = service
            .list_latest(ListRatesParams {
                base: None,
                target: None,
                q: Some("THB".into()),
            })
            .await
            .unwrap();
        assert_eq!(thb_rows.len(), 2);
    }

    #[tokio::test]
    async fn test_history_requires_base_and_target() {
        let (_, _, service) = rates_service();

        let missing = service
            .history(HistoryParams {
                base: Some("USD".into()),
                target: None,
                start_date: None,
                end_date: None,
                limit: None,
            })
            .await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let bad_date = service
            .history(HistoryParams {
                base: Some("USD".into()),
                target: Some("EUR".into()),
                start_date: Some("13/01/2024".into()),
                end_date: None,
                limit: None,
            })
            .await;
        assert!(matches!(bad_date, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_history_passes_filters_through() {
        let (repo, _, service) = rates_service();
        repo.append_history(&latest("USD", "EUR", 0.91, Utc::now() - Duration::hours(2)))
            .await
            .unwrap();
        repo.append_history(&latest("USD", "EUR", 0.92, Utc::now()))
            .await
            .unwrap();
        repo.append_history(&latest("USD", "THB", 35.0, Utc::now()))
            .await
            .unwrap();

        let rows = service
            .history(HistoryParams {
                base: Some("USD".into()),
                target: Some("EUR".into()),
                start_date: None,
                end_date: None,
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        // Most recent first
        assert_eq!(rows[0].rate, 0.92);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Integration management
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_integration_applies_defaults() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo.clone());

        let created = service
            .create(create_request("Primary", "mock"))
            .await
            .unwrap();

        assert_eq!(created.priority, 100);
        assert_eq!(created.poll_interval_seconds, 300);
        assert!(created.active);
    }

    #[tokio::test]
    async fn test_create_integration_rejects_unknown_provider() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let result = service
            .create(create_request("Primary", "openexchange"))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_integration_rejects_bad_interval() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let mut req = create_request("Primary", "mock");
        req.poll_interval_seconds = Some(30);

        let result = service.create(req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_integration_not_found() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let result = service.get(IntegrationId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_with_no_fields_rejected() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let created = service
            .create(create_request("Primary", "mock"))
            .await
            .unwrap();

        let result = service
            .update(created.id, UpdateIntegrationRequest::default())
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_empty_api_key_clears_credential() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo.clone());

        let mut req = create_request("Primary", "mock");
        req.api_key = Some("secret".into());
        let created = service.create(req).await.unwrap();
        assert!(
            repo.get_integration(created.id)
                .await
                .unwrap()
                .unwrap()
                .api_key
                .is_some()
        );

        service
            .update(
                created.id,
                UpdateIntegrationRequest {
                    api_key: Some("".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(
            repo.get_integration(created.id)
                .await
                .unwrap()
                .unwrap()
                .api_key
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_update_validates_fields() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let created = service
            .create(create_request("Primary", "mock"))
            .await
            .unwrap();

        let result = service
            .update(
                created.id,
                UpdateIntegrationRequest {
                    poll_interval_seconds: Some(7200),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_list_integrations_rejects_unknown_provider_filter() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo);

        let result = service
            .list(ListIntegrationsParams {
                active: None,
                provider: Some("openexchange".into()),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_deactivate_then_delete() {
        let repo = Arc::new(MockRepo::new());
        let service = IntegrationService::new(repo.clone());

        let created = service
            .create(create_request("Primary", "mock"))
            .await
            .unwrap();

        service.deactivate(created.id).await.unwrap();
        assert!(
            !repo
                .get_integration(created.id)
                .await
                .unwrap()
                .unwrap()
                .active
        );

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Usage views
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_integration_usage_unknown_id_not_found() {
        let repo = Arc::new(MockRepo::new());
        let service = UsageService::new(repo);

        let result = service.integration_usage(IntegrationId::new(), None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_integration_usage_rollup() {
        let repo = Arc::new(MockRepo::new());
        let integrations = IntegrationService::new(repo.clone());
        let usage = UsageService::new(repo.clone());

        let created = integrations
            .create(create_request("Primary", "mock"))
            .await
            .unwrap();
        repo.record_usage(created.id, 4, &UsageMetrics::default())
            .await
            .unwrap();

        let rollup = usage.integration_usage(created.id, None).await.unwrap();
        assert_eq!(rollup.today.as_ref().map(|t| t.calls_made), Some(4));
        assert_eq!(rollup.history.len(), 1);
    }

    #[tokio::test]
    async fn test_popular_pairs_counts() {
        let repo = Arc::new(MockRepo::new());
        let usage = UsageService::new(repo.clone());

        for _ in 0..3 {
            repo.log_conversion(&code("USD"), &code("EUR"), 1.0, 0.92, 0.92)
                .await
                .unwrap();
        }
        repo.log_conversion(&code("GBP"), &code("JPY"), 1.0, 189.0, 189.0)
            .await
            .unwrap();

        let pairs = usage.popular_pairs(None, None).await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].from_currency, code("USD"));
        assert_eq!(pairs[0].conversions, 3);
    }

    #[tokio::test]
    async fn test_currencies_sorted_union() {
        let (repo, _, service) = rates_service();
        repo.seed_rate("USD", "THB", 35.0, Utc::now());
        repo.seed_rate("EUR", "USD", 1.08, Utc::now());

        let currencies = service.currencies().await.unwrap();
        let codes: Vec<&str> = currencies.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "THB", "USD"]);
    }

    // Keep the pair helper exercised; scheduler tests reuse it.
    #[tokio::test]
    async fn test_mock_cache_round_trip() {
        let cache = MockCache::new();
        let row = latest("USD", "EUR", 0.92, Utc::now());
        cache.set(&row, StdDuration::from_secs(60)).await;
        assert_eq!(cache.get(&pair("USD", "EUR")).await, Some(row));
        cache.invalidate(&pair("USD", "EUR")).await;
        assert!(cache.get(&pair("USD", "EUR")).await.is_none());
    }
}
