use std::path::PathBuf;

use axum::extract::FromRef;
use clap::{Parser, Subcommand};
use directories_next::ProjectDirs;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod controllers;
mod crypto;
mod db;
mod error;
mod models;
mod sweeper;
mod types;

use config::Config;
use db::Database;
pub(crate) use error::AppResult;

#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub database: Database,
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run the expiry sweeper.
    Serve,
    /// Delete expired pastes once and exit.
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sealbin=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path).await?;

    let database = Database::connect(&config.database).await?;

    let app = App { config, database };

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}

/// The per-user config file if it exists, otherwise `config.toml` in the
/// working directory.
fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "sealbin")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
pub(crate) async fn test_app() -> App {
    App {
        config: Config {
            base_url: "http://localhost:8080".to_owned(),
            port: 8080,
            database: config::Database {
                url: "sqlite::memory:".to_owned(),
                max_connections: 1,
            },
            limits: Default::default(),
            sweeper: Default::default(),
            crypto: Default::default(),
        },
        database: db::tests::memory_database().await,
    }
}
