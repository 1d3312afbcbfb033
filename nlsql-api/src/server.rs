use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::ApiState;

pub struct ApiServer {
    host: String,
    port: u16,
    state: Arc<ApiState>,
}

impl ApiServer {
    pub fn new(host: String, port: u16, state: Arc<ApiState>) -> Self {
        Self { host, port, state }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/threads", get(handlers::list_threads).post(handlers::create_thread))
            .route("/api/threads/:id", get(handlers::get_thread))
            .route(
                "/api/threads/:id/messages",
                get(handlers::get_messages).post(handlers::post_message),
            )
            .route("/api/threads/:id/tokens", get(handlers::get_tokens))
            .route("/api/threads/:id/databases", get(handlers::get_databases))
            .route("/api/data-sources", get(handlers::list_data_sources))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        let app = self.router();
        tracing::info!(%addr, "starting API server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

