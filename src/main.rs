use anyhow::{Context, Result};
use axum::Router;
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager,
            tower::{StreamableHttpServerConfig, StreamableHttpService},
        },
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cricket_analyst::CricketAnalyst;
use cricket_analyst::config::{Config, TransportMode};
use cricket_analyst::service::AnalystService;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());
    let analyst = Arc::new(CricketAnalyst::new(&config)?);
    let service = AnalystService::new(analyst, Arc::clone(&config));

    match config.transport.mode {
        TransportMode::Http => {
            let bind: SocketAddr = config
                .transport
                .http_bind
                .parse()
                .with_context(|| format!("Invalid http_bind '{}' (expected host:port)", config.transport.http_bind))?;
            let path = config.transport.http_path.clone();

            let svc_factory_service = service.clone();
            let http_service: StreamableHttpService<AnalystService, _> = StreamableHttpService::new(
                move || Ok(svc_factory_service.clone()),
                Arc::new(LocalSessionManager::default()),
                StreamableHttpServerConfig {
                    stateful_mode: true,
                    sse_keep_alive: Some(Duration::from_secs(15)),
                },
            );

            let router = Router::new()
                .nest_service(path.as_str(), http_service)
                .route("/health", axum::routing::get(|| async { "ok" }));

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(%bind, path = %path, "Starting Streamable HTTP MCP server");

            axum::serve(listener, router).await?;
            Ok(())
        }
        TransportMode::Stdio => {
            tracing::info!("main: Service created, starting server on stdio transport");
            let server = service.serve(stdio()).await?;
            server.waiting().await?;
            tracing::info!("main: Server connection closed");
            Ok(())
        }
    }
}
