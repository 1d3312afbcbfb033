use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nlsql_api::{ApiServer, ApiState};
use nlsql_core::config::Config;
use nlsql_core::prompts::PromptRegistry;
use nlsql_core::schema::SchemaCatalog;
use nlsql_datasources::{DatasourceCatalog, DatasourceManager};
use nlsql_llm::adapters::factory::build_adapter;
use nlsql_llm::LlmClient;
use nlsql_orchestrator::Orchestrator;
use nlsql_session::{InMemorySessionStore, SessionStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nlsql-agent", about = "Natural-language-to-SQL orchestration core")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::from_default_env()))
        .init();

    tracing::info!(provider = %config.llm.provider, "loaded configuration");

    let schema_catalog = Arc::new(SchemaCatalog::load_dir(&config.declarative.schema_dir)?);
    let prompt_registry = Arc::new(PromptRegistry::load_with_overrides(&config.declarative.prompts_file)?);
    let datasource_catalog = DatasourceCatalog::load(&config.declarative.datasources_file)?;
    let datasources = Arc::new(DatasourceManager::connect(&datasource_catalog, &config.pool).await?);

    let adapter = build_adapter(&config.llm);
    let llm = Arc::new(LlmClient::new(adapter, prompt_registry, config.llm.clone()));

    let session_store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    let orchestrator = Arc::new(Orchestrator::new(
        llm,
        schema_catalog,
        datasources.clone(),
        session_store.clone(),
        config.history_window,
        Duration::from_secs(config.turn_deadline_seconds),
    ));

    let state = Arc::new(ApiState::new(orchestrator, session_store, datasources));
    let server = ApiServer::new(config.host.clone(), config.port, state);
    server.start().await
}
