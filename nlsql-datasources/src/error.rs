use nlsql_core::types::ErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasourceError {
    #[error("unknown database id: {0}")]
    UnknownDatabase(String),

    #[error("step spans multiple datasources: {0:?}")]
    CrossDatasourceScope(Vec<String>),

    #[error("statement is not a read-only query: {0}")]
    NotReadOnly(String),

    #[error("failed to load datasource catalog {path}: {source}")]
    CatalogLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("pool for {db_id} failed to initialize: {source}")]
    PoolInit {
        db_id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{category:?}: {message}")]
    Query { category: ErrorCategory, message: String },
}

impl DatasourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DatasourceError::UnknownDatabase(_) => ErrorCategory::Schema,
            DatasourceError::CrossDatasourceScope(_) => ErrorCategory::Schema,
            DatasourceError::NotReadOnly(_) => ErrorCategory::Permission,
            DatasourceError::CatalogLoad { .. } => ErrorCategory::Other,
            DatasourceError::PoolInit { .. } => ErrorCategory::Connection,
            DatasourceError::Query { category, .. } => *category,
        }
    }
}
