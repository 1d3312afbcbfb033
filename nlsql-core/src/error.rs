use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("database id not found in catalog: {0}")]
    UnknownDatabase(String),

    #[error("table {table} not found in database {db_id}")]
    UnknownTable { db_id: String, table: String },

    #[error("prompt template not found: {0}")]
    UnknownTemplate(String),

    #[error("missing prompt variable: {0}")]
    MissingVariable(String),

    #[error("failed to load declarative file {path}: {source}")]
    DeclarativeLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
