// src/main.rs

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use inkpost::config::Config;
use inkpost::state::AppState;
use inkpost::utils::mail;
use inkpost::{db, routes};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Bring the database up to date, then serve (the default).
    Serve,
    /// Apply migrations, upsert roles, restore self-follows and exit.
    Deploy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command = Cli::parse().command.unwrap_or(Command::Serve);

    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    // Logs go to stdout, and to daily files for profiles that want them.
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let (file_layer, _guard) = if config.profile.logs_to_file() {
        let file_appender = tracing_appender::rolling::daily("logs", "inkpost.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer().with_writer(non_blocking).with_ansi(false).boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!("Starting with the {:?} profile", config.profile);

    let pool = db::connect(&config.database_url, 5).await?;
    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;
    db::deploy(&pool).await?;
    tracing::info!("Migrations and reference data applied.");

    if command == Command::Deploy {
        return Ok(());
    }

    let mailer = mail::from_config(&config.mail)?;
    let addr = config.bind_addr;
    let state = AppState::new(pool, config, mailer);

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
