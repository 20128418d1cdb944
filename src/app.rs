use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::AppSettings,
    routes::{RouterOptions, build_router},
    shutdown::shutdown_signal,
    state::init_state_with_pg,
    tracing::{init_sentry, init_tracing},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub enum Commands {
    /// Start the web server
    Server {
        /// Optional TOML file; environment variables override it
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show version information
    Version,
}

/// Brings up every dependency, then binds. A failure before the bind leaves
/// the port untouched.
pub async fn start(config: &AppSettings) -> Result<()> {
    let state = init_state_with_pg(config).await?;
    let router = build_router(
        state,
        RouterOptions {
            enable_debug_routes: config.server.enable_debug_routes,
        },
    )?;

    let listener = TcpListener::bind(config.server.full_url())
        .await
        .with_context(|| format!("failed to bind {}", config.server.full_url()))?;
    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server has gracefully shutdown");
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Commands::parse();
    match cli {
        Commands::Server { config } => {
            // a missing .env file is fine
            dotenvy::dotenv().ok();
            let config = AppSettings::new(config.as_deref().map(Path::new))?;

            init_tracing(&config.logger)?;
            let _sentry_guard = config.sentry.as_ref().map(init_sentry).transpose()?;
            if let Err(err) = start(&config).await {
                tracing::error!(error = ?err, "Server failed to start");
                return Err(err);
            }
            Ok(())
        }
        Commands::Version => {
            println!(
                "{} ({})",
                env!("CARGO_PKG_VERSION"),
                option_env!("BUILD_SHA")
                    .or(option_env!("GITHUB_SHA"))
                    .unwrap_or("dev")
            );
            Ok(())
        }
    }
}
