//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use ratehub_types::{
    AggregatedUsage, ConversionLogEntry, CurrencyCode, CurrencyPair, HistoryQuery, Integration,
    IntegrationFilter, IntegrationId, IntegrationUpdate, LatestRate, NewIntegration, PopularPair,
    RateFilter, RateHistoryEntry, RateRepository, RepoError, RequestLogEntry, RequestStats,
    UsageMetrics, UsageRecord,
};

use crate::crypto::CredentialCipher;
use crate::types::{
    DbAggregatedUsageRow, DbConversionRow, DbCurrencyRow, DbHistoryRow, DbIntegration,
    DbLatestRate, DbPopularPairRow, DbRequestLogRow, DbRequestStatsRow, DbUsageRow, parse_code,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
    cipher: CredentialCipher,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_integrations.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_rates.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_telemetry.sql"),
        "0003",
    )
    .await?;

    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str, cipher: CredentialCipher) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        run_migrations(&pool).await?;

        Ok(Self { pool, cipher })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

const INTEGRATION_COLUMNS: &str = "id, name, provider, base_url, api_key_enc, priority, \
                                   poll_interval_seconds, active, created_at, updated_at";

#[async_trait]
impl RateRepository for SqliteRepo {
    async fn create_integration(&self, data: NewIntegration) -> Result<Integration, RepoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let api_key_enc = match &data.api_key {
            Some(plain) => Some(self.cipher.encrypt(plain)?),
            None => None,
        };

        sqlx::query(
            r#"INSERT INTO integrations
               (id, name, provider, base_url, api_key_enc, priority, poll_interval_seconds, active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(&data.name)
        .bind(data.provider.as_str())
        .bind(&data.base_url)
        .bind(&api_key_enc)
        .bind(data.priority)
        .bind(data.poll_interval_seconds)
        .bind(data.active)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(Integration::from_parts(
            IntegrationId::from_uuid(id),
            data.name,
            data.provider,
            data.base_url,
            data.api_key,
            data.priority,
            data.poll_interval_seconds,
            data.active,
            now,
            now,
        ))
    }

    async fn get_integration(
        &self,
        id: IntegrationId,
    ) -> Result<Option<Integration>, RepoError> {
        let sql = format!("SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE id = ?");

        let row: Option<DbIntegration> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(|r| r.into_domain(Some(&self.cipher))).transpose()
    }

    async fn list_integrations(
        &self,
        filter: IntegrationFilter,
    ) -> Result<Vec<Integration>, RepoError> {
        let mut sql = format!("SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE 1=1");
        if filter.active.is_some() {
            sql.push_str(" AND active = ?");
        }
        if filter.provider.is_some() {
            sql.push_str(" AND provider = ?");
        }
        sql.push_str(" ORDER BY priority ASC, created_at DESC");

        let mut query = sqlx::query_as::<_, DbIntegration>(&sql);
        if let Some(active) = filter.active {
            query = query.bind(active);
        }
        if let Some(provider) = filter.provider {
            query = query.bind(provider.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(|r| r.into_domain(None)).collect()
    }

    async fn update_integration(
        &self,
        id: IntegrationId,
        update: IntegrationUpdate,
    ) -> Result<Integration, RepoError> {
        update.validate()?;

        let api_key_enc = match &update.api_key {
            Some(Some(plain)) => Some(self.cipher.encrypt(plain)?),
            _ => None,
        };

        let mut sql = String::from("UPDATE integrations SET updated_at = ?");
        if update.name.is_some() {
            sql.push_str(", name = ?");
        }
        if update.provider.is_some() {
            sql.push_str(", provider = ?");
        }
        if update.base_url.is_some() {
            sql.push_str(", base_url = ?");
        }
        if update.api_key.is_some() {
            sql.push_str(", api_key_enc = ?");
        }
        if update.priority.is_some() {
            sql.push_str(", priority = ?");
        }
        if update.poll_interval_seconds.is_some() {
            sql.push_str(", poll_interval_seconds = ?");
        }
        if update.active.is_some() {
            sql.push_str(", active = ?");
        }
        sql.push_str(" WHERE id = ?");

        let mut query = sqlx::query(&sql).bind(Utc::now().to_rfc3339());
        if let Some(name) = &update.name {
            query = query.bind(name);
        }
        if let Some(provider) = update.provider {
            query = query.bind(provider.as_str());
        }
        if let Some(base_url) = &update.base_url {
            query = query.bind(base_url);
        }
        if update.api_key.is_some() {
            query = query.bind(&api_key_enc);
        }
        if let Some(priority) = update.priority {
            query = query.bind(priority);
        }
        if let Some(seconds) = update.poll_interval_seconds {
            query = query.bind(seconds);
        }
        if let Some(active) = update.active {
            query = query.bind(active);
        }
        query = query.bind(id.to_string());

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.get_integration(id).await?.ok_or(RepoError::NotFound)
    }

    async fn deactivate_integration(&self, id: IntegrationId) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE integrations SET active = 0, updated_at = ? WHERE id = ?"#)
                .bind(Utc::now().to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_integration(&self, id: IntegrationId) -> Result<(), RepoError> {
        let result = sqlx::query(r#"DELETE FROM integrations WHERE id = ?"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_active_integrations(&self) -> Result<Vec<Integration>, RepoError> {
        let sql = format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE active = 1 \
             ORDER BY priority ASC, created_at DESC"
        );

        let rows: Vec<DbIntegration> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| r.into_domain(Some(&self.cipher)))
            .collect()
    }

    async fn upsert_latest(&self, rate: &LatestRate) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO rates_latest (pair, base, target, rate, fetched_at, source_integration_id)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (pair) DO UPDATE SET
                   rate = excluded.rate,
                   fetched_at = excluded.fetched_at,
                   source_integration_id = excluded.source_integration_id"#,
        )
        .bind(rate.pair().key())
        .bind(rate.base.as_str())
        .bind(rate.target.as_str())
        .bind(rate.rate)
        .bind(rate.fetched_at.to_rfc3339())
        .bind(rate.source_integration_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn append_history(&self, rate: &LatestRate) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO rates_history (base, target, rate, fetched_at, source_integration_id)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(rate.base.as_str())
        .bind(rate.target.as_str())
        .bind(rate.rate)
        .bind(rate.fetched_at.to_rfc3339())
        .bind(rate.source_integration_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_latest(&self, pair: &CurrencyPair) -> Result<Option<LatestRate>, RepoError> {
        let row: Option<DbLatestRate> = sqlx::query_as(
            r#"SELECT base, target, rate, fetched_at, source_integration_id
               FROM rates_latest WHERE pair = ?"#,
        )
        .bind(pair.key())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbLatestRate::into_domain).transpose()
    }

    async fn list_latest(&self, filter: RateFilter) -> Result<Vec<LatestRate>, RepoError> {
        let mut sql = String::from(
            "SELECT base, target, rate, fetched_at, source_integration_id \
             FROM rates_latest WHERE 1=1",
        );
        if filter.base.is_some() {
            sql.push_str(" AND base = ?");
        }
        if filter.target.is_some() {
            sql.push_str(" AND target = ?");
        }
        if filter.search.is_some() {
            sql.push_str(" AND pair LIKE ?");
        }
        sql.push_str(" ORDER BY fetched_at DESC LIMIT 100");

        let mut query = sqlx::query_as::<_, DbLatestRate>(&sql);
        if let Some(base) = &filter.base {
            query = query.bind(base.as_str());
        }
        if let Some(target) = &filter.target {
            query = query.bind(target.as_str());
        }
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{}%", search.trim().to_uppercase()));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLatestRate::into_domain).collect()
    }

    async fn get_history(&self, query: HistoryQuery) -> Result<Vec<RateHistoryEntry>, RepoError> {
        let mut sql = String::from(
            "SELECT id, base, target, rate, fetched_at, source_integration_id \
             FROM rates_history WHERE base = ? AND target = ?",
        );
        // The end date is inclusive: filter strictly before the next midnight.
        let end_exclusive = query.end_date.and_then(|d| d.succ_opt());
        if query.start_date.is_some() {
            sql.push_str(" AND fetched_at >= ?");
        }
        if end_exclusive.is_some() {
            sql.push_str(" AND fetched_at < ?");
        }
        sql.push_str(" ORDER BY fetched_at DESC LIMIT ?");

        let mut stmt = sqlx::query_as::<_, DbHistoryRow>(&sql)
            .bind(query.base.as_str())
            .bind(query.target.as_str());
        if let Some(start) = query.start_date {
            stmt = stmt.bind(start.and_time(NaiveTime::MIN).and_utc().to_rfc3339());
        }
        if let Some(end) = end_exclusive {
            stmt = stmt.bind(end.and_time(NaiveTime::MIN).and_utc().to_rfc3339());
        }
        stmt = stmt.bind(query.limit);

        let rows = stmt
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbHistoryRow::into_domain).collect()
    }

    async fn list_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError> {
        let rows: Vec<DbCurrencyRow> = sqlx::query_as(
            r#"SELECT base AS code FROM rates_latest
               UNION
               SELECT target AS code FROM rates_latest
               ORDER BY code ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.iter().map(|r| parse_code(&r.code)).collect()
    }

    async fn record_usage(
        &self,
        integration_id: IntegrationId,
        calls_made: i64,
        metrics: &UsageMetrics,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO integration_usage
               (integration_id, date, calls_made, calls_limit, calls_remaining, reset_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (integration_id, date) DO UPDATE SET
                   calls_made = integration_usage.calls_made + excluded.calls_made,
                   calls_limit = COALESCE(excluded.calls_limit, integration_usage.calls_limit),
                   calls_remaining = COALESCE(excluded.calls_remaining, integration_usage.calls_remaining),
                   reset_at = COALESCE(excluded.reset_at, integration_usage.reset_at)"#,
        )
        .bind(integration_id.to_string())
        .bind(Utc::now().date_naive().to_string())
        .bind(calls_made)
        .bind(metrics.limit)
        .bind(metrics.calls_remaining)
        .bind(metrics.reset_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn record_usage_error(
        &self,
        integration_id: IntegrationId,
        message: &str,
    ) -> Result<(), RepoError> {
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO integration_usage
               (integration_id, date, calls_made, last_error, last_error_at)
               VALUES (?, ?, 0, ?, ?)
               ON CONFLICT (integration_id, date) DO UPDATE SET
                   last_error = excluded.last_error,
                   last_error_at = excluded.last_error_at"#,
        )
        .bind(integration_id.to_string())
        .bind(now.date_naive().to_string())
        .bind(message)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn usage_stats(
        &self,
        integration_id: IntegrationId,
        days: i64,
    ) -> Result<Vec<UsageRecord>, RepoError> {
        let cutoff = (Utc::now().date_naive() - Duration::days(days)).to_string();

        let rows: Vec<DbUsageRow> = sqlx::query_as(
            r#"SELECT integration_id, date, calls_made, calls_limit, calls_remaining,
                      reset_at, last_error, last_error_at
               FROM integration_usage
               WHERE integration_id = ? AND date >= ?
               ORDER BY date DESC"#,
        )
        .bind(integration_id.to_string())
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbUsageRow::into_domain).collect()
    }

    async fn today_usage(
        &self,
        integration_id: IntegrationId,
    ) -> Result<Option<UsageRecord>, RepoError> {
        let row: Option<DbUsageRow> = sqlx::query_as(
            r#"SELECT integration_id, date, calls_made, calls_limit, calls_remaining,
                      reset_at, last_error, last_error_at
               FROM integration_usage
               WHERE integration_id = ? AND date = ?"#,
        )
        .bind(integration_id.to_string())
        .bind(Utc::now().date_naive().to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUsageRow::into_domain).transpose()
    }

    async fn aggregated_usage(&self, days: i64) -> Result<Vec<AggregatedUsage>, RepoError> {
        let cutoff = (Utc::now().date_naive() - Duration::days(days)).to_string();

        let rows: Vec<DbAggregatedUsageRow> = sqlx::query_as(
            r#"SELECT i.id, i.name, i.provider, i.active,
                      COALESCE(SUM(u.calls_made), 0) AS total_calls,
                      MAX(u.last_error) AS last_error,
                      MAX(u.last_error_at) AS last_error_at
               FROM integrations i
               LEFT JOIN integration_usage u
                   ON u.integration_id = i.id AND u.date >= ?
               GROUP BY i.id, i.name, i.provider, i.active
               ORDER BY i.priority ASC"#,
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(DbAggregatedUsageRow::into_domain)
            .collect()
    }

    async fn log_request(
        &self,
        integration_id: IntegrationId,
        success: bool,
        response_time_ms: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO request_log
               (integration_id, success, response_time_ms, error_message, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(integration_id.to_string())
        .bind(success)
        .bind(response_time_ms)
        .bind(error_message)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn recent_requests(
        &self,
        integration_id: Option<IntegrationId>,
        limit: i64,
    ) -> Result<Vec<RequestLogEntry>, RepoError> {
        let mut sql = String::from(
            "SELECT id, integration_id, success, response_time_ms, error_message, created_at \
             FROM request_log WHERE 1=1",
        );
        if integration_id.is_some() {
            sql.push_str(" AND integration_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut stmt = sqlx::query_as::<_, DbRequestLogRow>(&sql);
        if let Some(id) = integration_id {
            stmt = stmt.bind(id.to_string());
        }
        stmt = stmt.bind(limit);

        let rows = stmt
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRequestLogRow::into_domain).collect()
    }

    async fn request_stats(
        &self,
        integration_id: IntegrationId,
        hours: i64,
    ) -> Result<RequestStats, RepoError> {
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();

        let row: DbRequestStatsRow = sqlx::query_as(
            r#"SELECT COUNT(*) AS total,
                      COALESCE(SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), 0) AS successes,
                      COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0) AS failures,
                      AVG(response_time_ms) AS avg_response_ms
               FROM request_log
               WHERE integration_id = ? AND created_at >= ?"#,
        )
        .bind(integration_id.to_string())
        .bind(&cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.into_domain())
    }

    async fn log_conversion(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: f64,
        result: f64,
        rate: f64,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO conversions (from_currency, to_currency, amount, result, rate, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(amount)
        .bind(result)
        .bind(rate)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn recent_conversions(
        &self,
        limit: i64,
    ) -> Result<Vec<ConversionLogEntry>, RepoError> {
        let rows: Vec<DbConversionRow> = sqlx::query_as(
            r#"SELECT id, from_currency, to_currency, amount, result, rate, created_at
               FROM conversions
               ORDER BY created_at DESC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbConversionRow::into_domain).collect()
    }

    async fn popular_pairs(&self, days: i64, limit: i64) -> Result<Vec<PopularPair>, RepoError> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

        let rows: Vec<DbPopularPairRow> = sqlx::query_as(
            r#"SELECT from_currency, to_currency, COUNT(*) AS conversions
               FROM conversions
               WHERE created_at >= ?
               GROUP BY from_currency, to_currency
               ORDER BY conversions DESC
               LIMIT ?"#,
        )
        .bind(&cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPopularPairRow::into_domain).collect()
    }
}
