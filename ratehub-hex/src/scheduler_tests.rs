//! Polling scheduler unit tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::Utc;

    use ratehub_types::{
        AppError, BaseCurrencies, HistoryQuery, Integration, IntegrationId, IntegrationUpdate,
        NewIntegration, ProviderKind, RateCache, RateRepository,
    };

    use crate::scheduler::{PollingScheduler, compute_diff, run_tick};
    use crate::service_tests::tests::{MockCache, MockRepo, code, pair};

    fn integration(name: &str, interval: i64) -> Integration {
        let now = Utc::now();
        Integration::from_parts(
            IntegrationId::new(),
            name.to_string(),
            ProviderKind::Mock,
            "http://localhost".to_string(),
            None,
            100,
            interval,
            true,
            now,
            now,
        )
    }

    async fn seed_integration(repo: &MockRepo, name: &str, interval: i64) -> Integration {
        let data = NewIntegration::new(
            name,
            "mock",
            "http://localhost",
            None,
            None,
            Some(interval),
            None,
        )
        .unwrap();
        repo.create_integration(data).await.unwrap()
    }

    fn make_scheduler(repo: &Arc<MockRepo>) -> Arc<PollingScheduler<MockRepo>> {
        Arc::new(PollingScheduler::new(
            Arc::clone(repo),
            Arc::new(MockCache::new()),
            BaseCurrencies::List(vec![code("USD")]),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reconciliation diff
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_diff_creates_new_integrations() {
        let a = integration("Alpha", 60);
        let b = integration("Beta", 120);

        let diff = compute_diff(&[a, b], &HashMap::new());

        assert_eq!(diff.create.len(), 2);
        assert!(diff.remove.is_empty());
        assert!(diff.recreate.is_empty());
    }

    #[test]
    fn test_diff_removes_vanished_jobs() {
        let gone = IntegrationId::new();
        let current = HashMap::from([(gone, 60)]);

        let diff = compute_diff(&[], &current);

        assert_eq!(diff.remove, vec![gone]);
        assert!(diff.create.is_empty());
        assert!(diff.recreate.is_empty());
    }

    #[test]
    fn test_diff_recreates_on_interval_change() {
        let a = integration("Alpha", 120);
        let current = HashMap::from([(a.id, 60)]);

        let diff = compute_diff(&[a.clone()], &current);

        assert!(diff.create.is_empty());
        assert!(diff.remove.is_empty());
        assert_eq!(diff.recreate.len(), 1);
        assert_eq!(diff.recreate[0].id, a.id);
    }

    #[test]
    fn test_diff_converged_is_empty() {
        let a = integration("Alpha", 60);
        let current = HashMap::from([(a.id, 60)]);

        let diff = compute_diff(&[a], &current);

        assert!(diff.create.is_empty());
        assert!(diff.remove.is_empty());
        assert!(diff.recreate.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Tick execution
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_tick_stores_snapshot_and_usage() {
        let repo = MockRepo::new();
        let cache = MockCache::new();
        let integration = integration("Primary", 60);
        let bases = BaseCurrencies::List(vec![code("USD")]);

        run_tick(&repo, &cache, &bases, &integration).await;

        let stored = repo.get_latest(&pair("USD", "EUR")).await.unwrap().unwrap();
        assert_eq!(stored.rate, 0.92);
        assert_eq!(stored.source_integration_id, Some(integration.id));
        assert_eq!(
            cache.get(&pair("USD", "EUR")).await.map(|r| r.rate),
            Some(0.92)
        );

        let history = repo
            .get_history(HistoryQuery {
                base: code("USD"),
                target: code("EUR"),
                start_date: None,
                end_date: None,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let requests = repo.recent_requests(None, 10).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].success);
        assert!(requests[0].response_time_ms.is_some());

        let usage = repo.today_usage(integration.id).await.unwrap().unwrap();
        assert_eq!(usage.calls_made, 1);
        assert_eq!(usage.calls_limit, Some(1000));
    }

    #[tokio::test]
    async fn test_tick_records_provider_failure() {
        let repo = MockRepo::new();
        let cache = MockCache::new();
        let integration = integration("Primary", 60);
        // The mock provider has no THB table entry
        let bases = BaseCurrencies::List(vec![code("THB")]);

        run_tick(&repo, &cache, &bases, &integration).await;

        let requests = repo
            .recent_requests(Some(integration.id), 10)
            .await
            .unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].success);
        assert!(requests[0].error_message.is_some());

        let usage = repo.today_usage(integration.id).await.unwrap().unwrap();
        assert_eq!(usage.calls_made, 1);
        assert!(usage.last_error.is_some());
    }

    #[tokio::test]
    async fn test_tick_all_bases_falls_back_to_anchors() {
        let repo = MockRepo::new();
        let cache = MockCache::new();
        let integration = integration("Primary", 60);

        // Empty store, so "all" expands to the anchor currencies
        run_tick(&repo, &cache, &BaseCurrencies::All, &integration).await;

        let usage = repo.today_usage(integration.id).await.unwrap().unwrap();
        assert_eq!(usage.calls_made, 4);
        assert!(repo.get_latest(&pair("EUR", "USD")).await.unwrap().is_some());
        assert!(repo.get_latest(&pair("JPY", "GBP")).await.unwrap().is_some());
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_schedules_active_integrations() {
        let repo = Arc::new(MockRepo::new());
        let active = seed_integration(&repo, "Primary", 60).await;
        let inactive = seed_integration(&repo, "Backup", 60).await;
        repo.deactivate_integration(inactive.id).await.unwrap();

        let scheduler = make_scheduler(&repo);
        scheduler.clone().start().await;

        let status = scheduler.status().await;
        assert!(status.running);
        assert_eq!(status.active_jobs, 1);
        assert_eq!(status.jobs[0].id, active.id);
        assert_eq!(status.jobs[0].interval_seconds, 60);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let repo = Arc::new(MockRepo::new());
        seed_integration(&repo, "Primary", 60).await;

        let scheduler = make_scheduler(&repo);
        scheduler.clone().start().await;
        scheduler.clone().start().await;

        let status = scheduler.status().await;
        assert!(status.running);
        assert_eq!(status.active_jobs, 1);

        scheduler.stop().await;
        scheduler.stop().await;
        assert!(!scheduler.status().await.running);
    }

    #[tokio::test]
    async fn test_resync_converges_job_table() {
        let repo = Arc::new(MockRepo::new());
        let first = seed_integration(&repo, "Alpha", 60).await;

        let scheduler = make_scheduler(&repo);
        scheduler.clone().start().await;
        assert_eq!(scheduler.status().await.active_jobs, 1);

        // Deactivate the old one, add a new one
        repo.deactivate_integration(first.id).await.unwrap();
        let second = seed_integration(&repo, "Beta", 120).await;
        scheduler.resync().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.active_jobs, 1);
        assert_eq!(status.jobs[0].id, second.id);

        // An interval change replaces the job
        repo.update_integration(
            second.id,
            IntegrationUpdate {
                poll_interval_seconds: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        scheduler.resync().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.active_jobs, 1);
        assert_eq!(status.jobs[0].interval_seconds, 300);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_resync_is_noop_when_stopped() {
        let repo = Arc::new(MockRepo::new());
        seed_integration(&repo, "Primary", 60).await;

        let scheduler = make_scheduler(&repo);
        scheduler.resync().await.unwrap();

        let status = scheduler.status().await;
        assert!(!status.running);
        assert_eq!(status.active_jobs, 0);
    }

    #[tokio::test]
    async fn test_stop_clears_job_table() {
        let repo = Arc::new(MockRepo::new());
        seed_integration(&repo, "Primary", 60).await;

        let scheduler = make_scheduler(&repo);
        scheduler.clone().start().await;
        assert_eq!(scheduler.status().await.active_jobs, 1);

        scheduler.stop().await;

        let status = scheduler.status().await;
        assert!(!status.running);
        assert_eq!(status.active_jobs, 0);
    }

    #[tokio::test]
    async fn test_trigger_requires_scheduled_job() {
        let repo = Arc::new(MockRepo::new());
        let scheduler = make_scheduler(&repo);

        let result = scheduler.trigger(IntegrationId::new()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_trigger_runs_tick_inline() {
        let repo = Arc::new(MockRepo::new());
        // Long interval so only the immediate tick and the trigger fire
        let integration = seed_integration(&repo, "Primary", 3600).await;

        let scheduler = make_scheduler(&repo);
        scheduler.clone().start().await;

        scheduler.trigger(integration.id).await.unwrap();

        // Rates are in the store by the time trigger returns
        assert!(repo.get_latest(&pair("USD", "EUR")).await.unwrap().is_some());
        let usage = repo.today_usage(integration.id).await.unwrap().unwrap();
        assert!(usage.calls_made >= 1);

        scheduler.stop().await;
    }
}
