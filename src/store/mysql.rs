//! MySQL-compatible record store (TiDB Cloud)

use super::traits::{Record, RecordStore, StoreError};
use crate::config::DatabaseSettings;
use crate::query::{ArticleQuery, ShiftRange, ARTICLE_WHITESPACE};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{
    MySql, MySqlColumn, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode,
};
use sqlx::{Column, QueryBuilder, Row, TypeInfo};
use std::time::Duration;
use tracing::debug;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Record store backed by a MySQL connection pool
pub struct MySqlStore {
    pool: MySqlPool,
    table: String,
}

impl MySqlStore {
    /// Build a lazily-connecting pool from settings. Must run inside a tokio runtime.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let mysql = &settings.mysql;
        let ssl_mode: MySqlSslMode = mysql.ssl_mode.parse()?;

        let mut options = MySqlConnectOptions::new()
            .port(mysql.port)
            .ssl_mode(ssl_mode);
        if let Some(ref host) = mysql.host {
            options = options.host(host);
        }
        if let Some(ref user) = mysql.user {
            options = options.username(user);
        }
        if let Some(ref password) = mysql.password {
            options = options.password(password);
        }
        if let Some(ref name) = mysql.name {
            options = options.database(name);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(mysql.max_connections)
            .acquire_timeout(Duration::from_secs(mysql.acquire_timeout))
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            table: settings.table.clone(),
        })
    }
}

#[async_trait]
impl RecordStore for MySqlStore {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_by_lots(&self, lots: &[String]) -> Result<Vec<Record>, StoreError> {
        if lots.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = lots_query(&self.table, lots);
        debug!("Running query: {} ({} params)", builder.sql(), lots.len());

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_by_shift_range(&self, range: &ShiftRange) -> Result<Vec<Record>, StoreError> {
        let sql = shift_range_sql(&self.table);
        debug!("Running query: {} [{}, {}]", sql, range.start, range.end);

        let rows = sqlx::query(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn search_article_numbers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let sql = article_search_sql(&self.table);
        let pattern = format!("%{}%", escape_like(needle));
        debug!("Running query: {} [{}, {}]", sql, pattern, limit);

        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(limit as u64)
            .fetch_all(&self.pool)
            .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(article) = row.try_get::<Option<String>, _>(0)? {
                articles.push(article);
            }
        }
        Ok(articles)
    }

    async fn fetch_by_articles(&self, query: &ArticleQuery) -> Result<Vec<Record>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = articles_query(&self.table, query.keys());
        debug!(
            "Running query: {} ({} params)",
            builder.sql(),
            query.keys().len()
        );

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}

/// SQL expression for the canonical article key, stripping every character
/// in `ARTICLE_WHITESPACE` after lowercasing
fn normalized_article_sql() -> String {
    ARTICLE_WHITESPACE
        .iter()
        .fold("LOWER(ArticleNumber)".to_string(), |expr, c| {
            let mut buf = [0u8; 4];
            let hex: String = c
                .encode_utf8(&mut buf)
                .bytes()
                .map(|b| format!("{:02X}", b))
                .collect();
            format!("REPLACE({}, CHAR(0x{} USING utf8mb4), '')", expr, hex)
        })
}

fn lots_query<'a>(table: &str, lots: &'a [String]) -> QueryBuilder<'a, MySql> {
    let mut builder = QueryBuilder::new(format!("SELECT * FROM {} WHERE LotID IN (", table));
    let mut separated = builder.separated(", ");
    for lot in lots {
        separated.push_bind(lot.as_str());
    }
    separated.push_unseparated(")");
    builder
}

fn articles_query<'a>(table: &str, keys: &'a [String]) -> QueryBuilder<'a, MySql> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT * FROM {} WHERE {} IN (",
        table,
        normalized_article_sql()
    ));
    let mut separated = builder.separated(", ");
    for key in keys {
        separated.push_bind(key.as_str());
    }
    separated.push_unseparated(")");
    builder
}

fn shift_range_sql(table: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE ShiftStartTime BETWEEN ? AND ?",
        table
    )
}

fn article_search_sql(table: &str) -> String {
    format!(
        "SELECT DISTINCT ArticleNumber FROM {} WHERE ArticleNumber IS NOT NULL AND {} LIKE ? LIMIT ?",
        table,
        normalized_article_sql()
    )
}

/// Escape LIKE wildcards so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Convert a row of any shape into a JSON object keyed by column name
fn row_to_record(row: &MySqlRow) -> Record {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_column(row, column)))
        .collect()
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> Value {
    let idx = column.ordinal();
    // DECIMAL arrives as text in the binary protocol
    if column.type_info().name() == "DECIMAL" {
        if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
            return v.map_or(Value::Null, |text| decimal_value(&text));
        }
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v.map_or(Value::Null, |t| {
            Value::String(t.format(DATETIME_FORMAT).to_string())
        });
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return v.map_or(Value::Null, |d| Value::String(d.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return v.map_or(Value::Null, |t| Value::String(t.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::String);
    }
    // JSON and other text-like types
    if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::String);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map_or(Value::Null, |b| {
            Value::String(String::from_utf8_lossy(&b).into_owned())
        });
    }
    Value::Null
}

/// DECIMAL text as a JSON number when an f64 holds it exactly enough to print
/// back the same value (at most 15 significant digits), else as a string
fn decimal_value(text: &str) -> Value {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0').trim_end_matches('0').len();
    if significant <= 15 {
        if let Some(n) = text.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lots_query_binds_each_lot() {
        let lots = vec!["L1".to_string(), "L2".to_string(), "L3".to_string()];
        let builder = lots_query("uqe_data", &lots);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM uqe_data WHERE LotID IN (?, ?, ?)"
        );
    }

    #[test]
    fn test_articles_query_uses_normalized_column() {
        let keys = vec!["ab12".to_string(), "cd".to_string()];
        let builder = articles_query("uqe_data", &keys);
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT * FROM uqe_data WHERE REPLACE("));
        assert!(sql.contains(&normalized_article_sql()));
        assert!(sql.ends_with(" IN (?, ?)"));
    }

    #[test]
    fn test_normalized_sql_strips_same_characters_as_normalize_article() {
        let sql = normalized_article_sql();
        assert!(sql.contains("LOWER(ArticleNumber)"));
        assert_eq!(sql.matches("REPLACE(").count(), ARTICLE_WHITESPACE.len());
        assert!(sql.contains("CHAR(0x20 USING utf8mb4)"));
        assert!(sql.contains("CHAR(0x09 USING utf8mb4)"));
        assert!(sql.contains("CHAR(0x0A USING utf8mb4)"));
        assert!(sql.contains("CHAR(0x0D USING utf8mb4)"));
        assert!(sql.contains("CHAR(0xC2A0 USING utf8mb4)"));

        for c in ARTICLE_WHITESPACE {
            assert_eq!(crate::query::normalize_article(&format!("AB{}12", c)), "ab12");
        }
    }

    #[test]
    fn test_shift_range_sql() {
        assert_eq!(
            shift_range_sql("uqe_data"),
            "SELECT * FROM uqe_data WHERE ShiftStartTime BETWEEN ? AND ?"
        );
    }

    #[test]
    fn test_search_sql_is_limited() {
        let sql = article_search_sql("uqe_data");
        assert!(sql.starts_with("SELECT DISTINCT ArticleNumber FROM uqe_data"));
        assert!(sql.ends_with("LIKE ? LIMIT ?"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ab"), "ab");
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
    }

    #[test]
    fn test_decimal_value() {
        assert_eq!(decimal_value("42"), serde_json::json!(42));
        assert_eq!(decimal_value("-7"), serde_json::json!(-7));
        assert_eq!(decimal_value("12.50"), serde_json::json!(12.5));
        assert_eq!(decimal_value("0.001"), serde_json::json!(0.001));
        assert_eq!(decimal_value("1000.000"), serde_json::json!(1000.0));
        assert_eq!(
            decimal_value("12345678901234567890.123"),
            Value::String("12345678901234567890.123".to_string())
        );
        assert_eq!(
            decimal_value("99999999999999999999"),
            Value::String("99999999999999999999".to_string())
        );
        assert_eq!(decimal_value("abc"), Value::String("abc".to_string()));
    }

    #[tokio::test]
    async fn test_connect_lazy_rejects_unknown_ssl_mode() {
        let mut settings = DatabaseSettings::default();
        settings.mysql.host = Some("localhost".to_string());
        settings.mysql.ssl_mode = "sometimes".to_string();
        assert!(MySqlStore::connect_lazy(&settings).is_err());
    }

    #[tokio::test]
    async fn test_connect_lazy_does_not_dial() {
        let mut settings = DatabaseSettings::default();
        settings.mysql.host = Some("127.0.0.1".to_string());
        settings.mysql.user = Some("reader".to_string());
        settings.mysql.name = Some("quality".to_string());
        settings.mysql.ssl_mode = "disabled".to_string();

        let store = MySqlStore::connect_lazy(&settings).unwrap();
        assert_eq!(store.name(), "mysql");
        assert!(store.fetch_by_lots(&[]).await.unwrap().is_empty());
    }
}
