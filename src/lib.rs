pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use services::{PlayerWatcher, TasklistSource};
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "shiori")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Daemon => run_daemon(config, prometheus_handle).await,
        Commands::Parse { raw } => cli::cmd_parse(&raw.join(" ")),
        Commands::Season { title } => cli::cmd_season(&title.join(" ")),
        Commands::Timeline { id } => cli::cmd_timeline(&config, id).await,
        Commands::Resolve { id, absolute } => cli::cmd_resolve(&config, id, absolute).await,
        Commands::List => cli::cmd_list_anime(&config).await,
        Commands::Add { id, status } => cli::cmd_add_anime(&config, id, &status).await,
        Commands::Remove { id } => cli::cmd_remove_anime(&config, id).await,
        Commands::Progress { id, episode } => cli::cmd_progress(&config, id, episode).await,
        Commands::Status { id, status } => cli::cmd_status(&config, id, &status).await,
        Commands::Map { raw_title, id } => cli::cmd_map(&config, &raw_title, id).await,
        Commands::Unmap { raw_title } => cli::cmd_unmap(&config, &raw_title.join(" ")).await,
        Commands::Mappings => cli::cmd_mappings(&config).await,
        Commands::History { limit } => cli::cmd_history(&config, limit).await,
        Commands::Import { user } => cli::cmd_import(&config, user.as_deref()).await,
        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }
    }
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Shiori v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    let watcher_handle = if config.watcher.enabled {
        let source = TasklistSource::new(&config.watcher.players);
        let watcher = PlayerWatcher::new(source, shared.pipeline.clone(), &config.watcher);
        Some(tokio::spawn(watcher.run()))
    } else {
        info!("Player watcher disabled");
        None
    };

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let api_state = api::create_app_state(Arc::clone(&shared), prometheus_handle);
        let app = api::router(api_state).await;
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        Some(tokio::spawn(async move {
            info!("Loopback server running at http://{}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    if let Some(handle) = watcher_handle {
        handle.abort();
    }
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}
