pub mod config;
pub mod discord;
pub mod error;
pub mod http;
pub mod plugins;
pub mod storage;

use crate::config::Config;
use crate::discord::client::DiscordInterface;
use crate::discord::commands::handle_interaction;
use crate::discord::confirm::ConfirmRegistry;
use crate::discord::paginate::Paginator;
use crate::http::HttpClient;
use crate::plugins::PluginRegistry;
use axum::{
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long paginated replies keep answering button clicks
pub const PAGINATOR_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub discord: Arc<dyn DiscordInterface>,
    pub http: Arc<HttpClient>,
    pub plugins: Arc<PluginRegistry>,
    pub confirms: Arc<ConfirmRegistry>,
    pub paginator: Arc<Paginator>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        discord: Arc<dyn DiscordInterface>,
        plugins: PluginRegistry,
    ) -> error::Result<Self> {
        let http = HttpClient::new(&config.http)?;
        Ok(Self {
            config: Arc::new(config),
            pool,
            discord,
            http: Arc::new(http),
            plugins: Arc::new(plugins),
            confirms: Arc::new(ConfirmRegistry::new()),
            paginator: Arc::new(Paginator::new(PAGINATOR_TTL)),
        })
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "supportbot",
        "version": VERSION
    }))
}

pub async fn root() -> &'static str {
    "🤖 supportbot - Discord interactions"
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhooks/discord", post(handle_interaction))
        .with_state(state)
}
