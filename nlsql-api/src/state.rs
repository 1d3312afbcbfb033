use std::sync::Arc;

use nlsql_datasources::DatasourceManager;
use nlsql_orchestrator::Orchestrator;
use nlsql_session::SessionStore;

pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub session_store: Arc<dyn SessionStore>,
    pub datasources: Arc<DatasourceManager>,
}

impl ApiState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        session_store: Arc<dyn SessionStore>,
        datasources: Arc<DatasourceManager>,
    ) -> Self {
        Self { orchestrator, session_store, datasources }
    }
}
