use anyhow::{Context, Result, anyhow};
use axum::Router;
use clap::Parser;
use config::EnvConfig;
use state::{AppState, SharedState};
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, sync::Arc};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::EnvFilter;

mod api;
mod config;
mod error;
mod state;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,
    #[arg(short, long, env = "CLOCKWEB_ENV", default_value = "dev")]
    pub env: String,
    #[arg(short, long, help = "Override the database from the config file")]
    pub database: Option<String>,
    #[arg(short, long)]
    pub listen: Option<String>,
    #[arg(short, long)]
    pub port: Option<u16>,
    #[arg(long, help = "Accept clock events from outside of store geofences")]
    pub no_geofence: bool,
}

fn load_config(args: &Cli) -> Result<EnvConfig> {
    let mut env = if args.config.exists() {
        debug!(path = ?args.config, "Reading configuration");
        let contents = std::fs::read_to_string(&args.config)
            .with_context(|| format!("Failed to read config file {:?}", args.config))?;
        let mut configs: HashMap<String, EnvConfig> = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", args.config))?;
        configs
            .remove(&args.env)
            .ok_or_else(|| anyhow!("No environment '{}' in {:?}", args.env, args.config))?
    } else {
        warn!(path = ?args.config, "Config file not found, using defaults");
        EnvConfig::default()
    };
    if let Some(database) = &args.database {
        env.database = database.clone();
    }
    if let Some(host) = &args.listen {
        env.listen.host = host.clone();
    }
    if let Some(port) = args.port {
        env.listen.port = port;
    }
    if args.no_geofence {
        env.geofence.enforce = false;
    }
    Ok(env)
}

/// The routes are served both at the root and under `/api`
fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .nest("/api", api::router())
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
fn test_app(pool: sqlx::Pool<sqlx::Sqlite>) -> (Router, AppState) {
    let state = Arc::new(SharedState::test(pool));
    (app(state.clone()), state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CLOCKWEB_LOG")
                .unwrap_or_else(|_| EnvFilter::new("clockweb=info,libclock=info,tower_http=info")),
        )
        .init();
    let args = Cli::parse();
    let env = load_config(&args)?;
    debug!("using database '{}'", env.database);

    let addr: SocketAddr = format!("{}:{}", env.listen.host, env.listen.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", env.listen.host))?;
    let shared_state = Arc::new(SharedState::new(env).await?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(shared_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
