//! SQLite-backed alert store

use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use std::str::FromStr;

use guardpost_core::{truncate_chars, Error, Result};

use crate::alert::{
    Alert, AlertFilter, AlertPage, AlertStats, DayCount, GroupCount, ListQuery, NewAlert,
};

/// Characters of detected text kept per alert
pub const MAX_TEXT_CHARS: usize = 1000;

/// Characters of user-agent string kept per alert
pub const MAX_BROWSER_CHARS: usize = 255;

/// Number of groups returned by each "top" ranking
const TOP_GROUPS: i64 = 10;

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS content_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    detected_text TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    browser_info TEXT NOT NULL,
    platform TEXT NOT NULL,
    screen_resolution TEXT NOT NULL,
    timezone TEXT NOT NULL,
    language TEXT NOT NULL,
    detected_at TEXT NOT NULL,
    device_info TEXT NOT NULL,
    scores TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alerts_detected_at ON content_alerts(detected_at);
CREATE INDEX IF NOT EXISTS idx_alerts_ip ON content_alerts(ip_address);
"#;

/// Alert persistence over a SQLite connection pool.
///
/// Cheap to clone; all methods take `&self`.
#[derive(Clone)]
pub struct AlertStore {
    pool: SqlitePool,
}

impl AlertStore {
    /// Wrap an existing pool. The schema must already be applied.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a file-backed database and apply the
    /// schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory database and apply the schema.
    ///
    /// Single-connection pool: each SQLite `:memory:` connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        tracing::info!("Alert store schema applied");
        Ok(())
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist one alert, returning its generated id.
    ///
    /// Detected text and user agent are capped here so the stored row always
    /// honors the length invariants, whatever the caller sends.
    pub async fn create(&self, alert: &NewAlert) -> Result<i64> {
        let detected_text = truncate_chars(&alert.detected_text, MAX_TEXT_CHARS);
        let browser_info = truncate_chars(alert.device.browser_or_unknown(), MAX_BROWSER_CHARS);

        let result = sqlx::query(
            r#"
            INSERT INTO content_alerts
            (url, detected_text, ip_address, browser_info, platform, screen_resolution,
             timezone, language, detected_at, device_info, scores, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.url)
        .bind(detected_text)
        .bind(alert.device.ip_or_unknown())
        .bind(browser_info)
        .bind(alert.device.platform_or_unknown())
        .bind(alert.device.screen_resolution())
        .bind(alert.device.timezone_or_unknown())
        .bind(alert.device.language_or_unknown())
        .bind(alert.detected_at)
        .bind(Json(&alert.device))
        .bind(Json(&alert.scores))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        tracing::debug!(alert_id = id, "Alert persisted");
        Ok(id)
    }

    /// Fetch one alert. `None` when absent — a normal outcome, not an error.
    pub async fn get(&self, id: i64) -> Result<Option<Alert>> {
        sqlx::query_as::<_, Alert>("SELECT * FROM content_alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// List alerts ordered by detection time descending.
    ///
    /// Rows with equal `detected_at` order by descending id so a fixed
    /// limit/offset window is stable.
    pub async fn list(&self, query: &ListQuery) -> Result<AlertPage> {
        let (total, items) = match &query.filter {
            None => {
                let total = sqlx::query_scalar("SELECT COUNT(*) FROM content_alerts")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_err)?;

                let items = sqlx::query_as::<_, Alert>(
                    "SELECT * FROM content_alerts \
                     ORDER BY detected_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

                (total, items)
            }

            Some(AlertFilter::IpEquals(ip)) => {
                let total = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM content_alerts WHERE ip_address = ?",
                )
                .bind(ip)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

                let items = sqlx::query_as::<_, Alert>(
                    "SELECT * FROM content_alerts WHERE ip_address = ? \
                     ORDER BY detected_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(ip)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

                (total, items)
            }

            Some(AlertFilter::OnDate(date)) => {
                let date = date.to_string();

                let total = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM content_alerts WHERE date(detected_at) = ?",
                )
                .bind(&date)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

                let items = sqlx::query_as::<_, Alert>(
                    "SELECT * FROM content_alerts WHERE date(detected_at) = ? \
                     ORDER BY detected_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(&date)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

                (total, items)
            }

            Some(AlertFilter::UrlContains(fragment)) => {
                let pattern = format!("%{}%", fragment);

                let total =
                    sqlx::query_scalar("SELECT COUNT(*) FROM content_alerts WHERE url LIKE ?")
                        .bind(&pattern)
                        .fetch_one(&self.pool)
                        .await
                        .map_err(db_err)?;

                let items = sqlx::query_as::<_, Alert>(
                    "SELECT * FROM content_alerts WHERE url LIKE ? \
                     ORDER BY detected_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(&pattern)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

                (total, items)
            }
        };

        Ok(AlertPage { items, total })
    }

    /// Aggregate view: totals, top offenders, platform breakdown, and the
    /// last seven days of activity.
    ///
    /// Rankings order by count descending; ties rank the first-inserted
    /// group first.
    pub async fn aggregate(&self) -> Result<AlertStats> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM content_alerts")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let top_ips = sqlx::query_as::<_, GroupCount>(
            "SELECT ip_address AS key, COUNT(*) AS count FROM content_alerts \
             GROUP BY ip_address ORDER BY count DESC, MIN(id) ASC LIMIT ?",
        )
        .bind(TOP_GROUPS)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let top_urls = sqlx::query_as::<_, GroupCount>(
            "SELECT url AS key, COUNT(*) AS count FROM content_alerts \
             GROUP BY url ORDER BY count DESC, MIN(id) ASC LIMIT ?",
        )
        .bind(TOP_GROUPS)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let by_platform = sqlx::query_as::<_, GroupCount>(
            "SELECT platform AS key, COUNT(*) AS count FROM content_alerts \
             GROUP BY platform ORDER BY count DESC, MIN(id) ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let cutoff = Utc::now() - Duration::days(7);
        let last_seven_days = sqlx::query_as::<_, DayCount>(
            "SELECT date(detected_at) AS day, COUNT(*) AS count FROM content_alerts \
             WHERE detected_at >= ? GROUP BY date(detected_at) ORDER BY day DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(AlertStats {
            total,
            top_ips,
            top_urls,
            by_platform,
            last_seven_days,
        })
    }

    /// Delete one alert. Returns whether a row was removed; deleting an
    /// unknown id is not an error.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_alerts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::persistence(e.to_string())
}
