mod cache;
mod report;
mod routes;
pub mod templates;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use reqwest::Client;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::discourse::{FetchSettings, RunSlot, ThreadFetcher};
use crate::summary::{NoopSummarizer, PersonaFile, Summarizer};

pub use cache::ReportCache;
pub use report::{export_filename, AnalysisReport};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Client used by the relay.
    pub http: Client,
    pub fetcher: ThreadFetcher,
    pub runs: Arc<RunSlot>,
    /// Report of the last analyzed thread, reused by page views.
    pub reports: Arc<ReportCache>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    /// Build state from configuration. Personas come from `PERSONAS_PATH`
    /// when it is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let summarizer: Arc<dyn Summarizer> = match &config.personas_path {
            Some(path) => Arc::new(PersonaFile::new(path)),
            None => Arc::new(NoopSummarizer),
        };
        Self::with_summarizer(config, summarizer)
    }

    /// Build state with an explicit summarizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_summarizer(config: Config, summarizer: Arc<dyn Summarizer>) -> Result<Self> {
        let http = config
            .http
            .build_client()
            .context("Failed to build HTTP client")?;
        let fetcher = ThreadFetcher::with_client(http.clone(), FetchSettings::from_config(&config));

        Ok(Self {
            config: Arc::new(config),
            http,
            fetcher,
            runs: Arc::new(RunSlot::new()),
            reports: Arc::new(ReportCache::new()),
            summarizer,
        })
    }
}

/// Start the web server and run until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(
    config: Config,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let state = AppState::new(config)?;
    info!(summarizer = state.summarizer.name(), "Summarizer configured");

    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
