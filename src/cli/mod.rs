use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::auth::password::hash_password;
use crate::config::AppConfig;
use crate::database::Database;
use crate::notify::{self, StockMonitor};
use crate::services::ProductService;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "merchant-admin")]
#[command(about = "Multi-tenant merchant administration API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Apply pending migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Run the low stock check once and exit")]
    CheckStock,

    #[command(about = "Print a bcrypt hash for seeding an admin account")]
    HashPassword {
        #[arg(help = "Plaintext password")]
        password: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        migrate: false,
    });

    match command {
        Commands::HashPassword { password } => {
            let hashed = hash_password(&password)?;
            println!("{}", hashed);
            Ok(())
        }
        Commands::Migrate => {
            let config = AppConfig::from_env()?;
            let db = Database::connect(&config.database).await?;
            db.migrate().await?;
            db.close().await;
            Ok(())
        }
        Commands::CheckStock => {
            let config = AppConfig::from_env()?;
            let db = Database::connect(&config.database).await?;
            let monitor = stock_monitor(&config, &db)?;
            let alerted = monitor.run_once().await?;
            tracing::info!("Stock check complete, {} merchants alerted", alerted);
            db.close().await;
            Ok(())
        }
        Commands::Serve { port, migrate } => serve(port, migrate).await,
    }
}

async fn serve(port: Option<u16>, migrate: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::info!("Starting merchant admin API in {:?} mode", config.environment);

    let db = Database::connect(&config.database).await?;
    if migrate {
        db.migrate().await?;
    }

    let monitor = if config.stock.monitor_enabled {
        Some(stock_monitor(&config, &db)?.spawn())
    } else {
        tracing::info!("Stock monitor disabled");
        None
    };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::new(config, db.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, crate::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = monitor {
        handle.abort();
    }
    db.close().await;
    Ok(())
}

fn stock_monitor(config: &AppConfig, db: &Database) -> anyhow::Result<StockMonitor> {
    let notifier = notify::from_config(&config.alerts);
    let monitor = StockMonitor::new(ProductService::new(db.pool().clone()), notifier, &config.stock)?;
    Ok(monitor)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
