use std::collections::HashMap;
use std::time::Instant;

use nlsql_core::config::PoolConfig;
use nlsql_core::types::{DataSourceSummary, ErrorCategory};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteColumn, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo};

use crate::catalog::DatasourceCatalog;
use crate::error::DatasourceError;
use crate::safety::is_read_only;

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub ok: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub error: Option<String>,
    pub category: Option<ErrorCategory>,
    pub elapsed_ms: u128,
}

/// One pooled connection per logical database id. Because the catalog enforces a
/// one-datasource-per-db-id bijection, a pool key IS a datasource identity —
/// `validate_scope` never needs to consult anything beyond the requested ids.
pub struct DatasourceManager {
    pools: HashMap<String, SqlitePool>,
    summaries: Vec<DataSourceSummary>,
}

impl DatasourceManager {
    pub async fn connect(catalog: &DatasourceCatalog, pool_config: &PoolConfig) -> Result<Self, DatasourceError> {
        let mut pools = HashMap::new();
        for entry in catalog.entries() {
            if entry.datasource.kind != "sqlite" {
                continue;
            }
            if entry.datasource.path != ":memory:" {
                if let Some(parent) = std::path::Path::new(&entry.datasource.path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| DatasourceError::PoolInit {
                            db_id: entry.id.clone(),
                            source: sqlx::Error::Io(e),
                        })?;
                    }
                }
            }
            let options = SqliteConnectOptions::new()
                .filename(&entry.datasource.path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .min_connections(pool_config.min_connections)
                .max_connections(pool_config.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(pool_config.connect_timeout_seconds))
                .connect_with(options)
                .await
                .map_err(|e| DatasourceError::PoolInit { db_id: entry.id.clone(), source: e })?;
            pools.insert(entry.id.clone(), pool);
        }
        Ok(Self { pools, summaries: catalog.summaries() })
    }

    pub fn list_sources(&self) -> &[DataSourceSummary] {
        &self.summaries
    }

    /// A step's `databases` list is in scope iff every entry names the same db id —
    /// the bijection means two distinct ids are, by definition, two datasources.
    pub fn validate_scope<'a>(&self, db_ids: &'a [String]) -> Result<&'a str, DatasourceError> {
        let mut unique: Vec<&str> = db_ids.iter().map(|s| s.as_str()).collect();
        unique.dedup();
        match unique.as_slice() {
            [] => Err(DatasourceError::CrossDatasourceScope(vec![])),
            [single] => {
                if self.pools.contains_key(*single) {
                    Ok(db_ids[0].as_str())
                } else {
                    Err(DatasourceError::UnknownDatabase(single.to_string()))
                }
            }
            _ => Err(DatasourceError::CrossDatasourceScope(db_ids.to_vec())),
        }
    }

    pub async fn execute(&self, sql: &str, db_id: &str) -> QueryResult {
        let start = Instant::now();

        if !is_read_only(sql) {
            return QueryResult {
                ok: false,
                error: Some(format!("rejected non-read-only statement: {sql}")),
                category: Some(ErrorCategory::Permission),
                elapsed_ms: start.elapsed().as_millis(),
                ..Default::default()
            };
        }

        let Some(pool) = self.pools.get(db_id) else {
            return QueryResult {
                ok: false,
                error: Some(format!("unknown database id: {db_id}")),
                category: Some(ErrorCategory::Schema),
                elapsed_ms: start.elapsed().as_millis(),
                ..Default::default()
            };
        };

        match sqlx::query(sql).fetch_all(pool).await {
            Ok(rows) => {
                let columns = rows
                    .first()
                    .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
                    .unwrap_or_default();
                let json_rows: Vec<Map<String, Value>> = rows.iter().map(row_to_json).collect();
                let row_count = json_rows.len();
                QueryResult {
                    ok: true,
                    columns,
                    rows: json_rows,
                    row_count,
                    error: None,
                    category: None,
                    elapsed_ms: start.elapsed().as_millis(),
                }
            }
            Err(e) => {
                let category = match &e {
                    sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => ErrorCategory::Connection,
                    _ => ErrorCategory::Other,
                };
                QueryResult {
                    ok: false,
                    error: Some(e.to_string()),
                    category: Some(category),
                    elapsed_ms: start.elapsed().as_millis(),
                    ..Default::default()
                }
            }
        }
    }
}

fn row_to_json(row: &SqliteRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, idx, column));
    }
    map
}

fn column_value(row: &SqliteRow, idx: usize, column: &SqliteColumn) -> Value {
    match column.type_info().name() {
        "INTEGER" | "BIGINT" | "INT" => row
            .try_get::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(Value::from).unwrap_or(Value::Null),
        _ => row.try_get::<String, _>(idx).map(Value::from).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, DatasourceSpec};

    fn catalog_with_memory_db(id: &str) -> DatasourceCatalog {
        DatasourceCatalog::from_entries(vec![CatalogEntry {
            id: id.to_string(),
            name: id.to_string(),
            description: "test db".to_string(),
            datasource: DatasourceSpec { kind: "sqlite".to_string(), path: ":memory:".to_string() },
        }])
    }

    #[tokio::test]
    async fn rejects_non_read_only_sql_without_touching_the_pool() {
        let catalog = catalog_with_memory_db("customer_db");
        let manager = DatasourceManager::connect(&catalog, &PoolConfig::default()).await.unwrap();
        let result = manager.execute("DELETE FROM customers", "customer_db").await;
        assert!(!result.ok);
        assert_eq!(result.category, Some(ErrorCategory::Permission));
    }

    #[tokio::test]
    async fn executes_simple_select() {
        let catalog = catalog_with_memory_db("customer_db");
        let manager = DatasourceManager::connect(&catalog, &PoolConfig::default()).await.unwrap();
        let result = manager.execute("SELECT 1 AS n", "customer_db").await;
        assert!(result.ok);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["n"], Value::from(1));
    }

    #[tokio::test]
    async fn validate_scope_rejects_multiple_distinct_ids() {
        let catalog = catalog_with_memory_db("customer_db");
        let manager = DatasourceManager::connect(&catalog, &PoolConfig::default()).await.unwrap();
        let ids = vec!["customer_db".to_string(), "accounts_db".to_string()];
        assert!(manager.validate_scope(&ids).is_err());
    }

    #[tokio::test]
    async fn validate_scope_accepts_repeated_single_id() {
        let catalog = catalog_with_memory_db("customer_db");
        let manager = DatasourceManager::connect(&catalog, &PoolConfig::default()).await.unwrap();
        let ids = vec!["customer_db".to_string(), "customer_db".to_string()];
        assert_eq!(manager.validate_scope(&ids).unwrap(), "customer_db");
    }
}
