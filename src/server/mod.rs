//! HTTP boundary: an axum router over a shared [`PromptGenerator`] and session store.

pub mod envelope;
pub mod handlers;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::pipeline::PromptGenerator;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<PromptGenerator>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(generator: PromptGenerator, server: &ServerConfig) -> Self {
        Self {
            generator: Arc::new(generator),
            sessions: Arc::new(SessionStore::new(
                server.max_session_turns,
                server.max_sessions,
            )),
        }
    }
}

/// All routes; each POST route is also served with a trailing slash
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/options", get(handlers::options))
        .route("/options/", get(handlers::options))
        .route("/sessions/:id", delete(handlers::delete_session));

    for path in ["/generate_prompts", "/generate_prompts/"] {
        router = router.route(path, post(handlers::generate_prompts));
    }
    for path in ["/summarize_prompts", "/summarize_prompts/"] {
        router = router.route(path, post(handlers::summarize_prompts));
    }
    for path in ["/generate_content", "/generate_content/"] {
        router = router.route(path, post(handlers::generate_content));
    }
    for path in ["/chat", "/chat/", "/ask", "/ask/", "/ask-gemini", "/ask-gemini/"] {
        router = router.route(path, post(handlers::chat));
    }

    router.with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(state: AppState, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
