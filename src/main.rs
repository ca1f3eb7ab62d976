// ABOUTME: Entry point for the nocli CLI application.
// ABOUTME: Parses arguments, sets up tracing, and dispatches to subcommands.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, LogFormat};
use nocli::config::{self, Config};
use nocli::error::{Error, Result};
use nocli::health::HealthStatus;
use nocli::runtime::{BollardRuntime, ConnectSnafu, ResolveSnafu, resolve_runtime};
use nocli::server::{self, AppState};
use snafu::ResultExt;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Error::Runtime(runtime) = &e {
            eprintln!("  hint: {}", runtime.hint());
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    // RUST_LOG wins when set
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Check { config } => {
            let config = load_config(&cwd, config.as_deref(), None, None)?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Commands::Serve {
            config,
            listen,
            daemon,
        } => {
            let config = load_config(&cwd, config.as_deref(), listen.as_deref(), daemon.as_deref())?;
            serve(config).await
        }
    }
}

/// File, then environment, then flags; validated.
fn load_config(
    cwd: &Path,
    explicit: Option<&Path>,
    listen: Option<&str>,
    daemon: Option<&str>,
) -> Result<Config> {
    let mut config = Config::resolve(cwd, explicit)?;
    config.apply_env()?;
    config.apply_overrides(listen, daemon)?;
    config.validate()?;
    Ok(config)
}

async fn serve(config: Config) -> Result<()> {
    let detected = resolve_runtime(config.daemon.endpoint.as_deref()).context(ResolveSnafu)?;
    tracing::info!(
        "Using {} at {}",
        detected.runtime_type,
        detected.endpoint
    );

    let runtime = BollardRuntime::connect(&detected, config.daemon.connect_timeout).context(
        ConnectSnafu {
            endpoint: detected.endpoint.clone(),
        },
    )?;

    let state = AppState::new(Arc::new(runtime), &config);

    // Startup does not require a live daemon; /healthz reports it
    match state.health.check().await {
        HealthStatus::Ok => tracing::info!("Daemon reachable"),
        HealthStatus::Degraded { error, .. } => tracing::warn!("Daemon not reachable yet: {}", error),
    }
    let shutdown = CancellationToken::new();

    if let Some(interval) = config.health.interval {
        state.health.watch(interval, shutdown.clone());
    }

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|source| Error::Bind {
            addr: config.listen,
            source,
        })?;
    tracing::info!("Listening on http://{}", config.listen);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        signal_token.cancel();
    });

    server::serve(listener, state, shutdown).await?;
    tracing::info!("Server stopped");
    Ok(())
}
