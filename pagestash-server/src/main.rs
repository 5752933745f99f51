use std::sync::Arc;

use clap::Parser;
use pagestash_core::{PagestashConfig, PgExecutor, QueryExecutor, StaticExecutor};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use pagestash_server::{server, state::AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "pagestash.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match PagestashConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Connect to DB, or fall back to static mode
    let executor: Arc<dyn QueryExecutor> = match pagestash_core::db::create_pool(&config.database).await {
        Ok(Some(pool)) => Arc::new(PgExecutor::new(pool, config.database.max_rows)),
        Ok(None) => {
            tracing::info!("No database configured; running in static schema mode");
            Arc::new(StaticExecutor::unavailable())
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match executor.health().await {
            Ok(v) => println!("✅ Database: {}", v),
            Err(e) => {
                println!("❌ Database check failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Pagestash health check passed");
        return Ok(());
    }

    let state = AppState::new(config.clone(), executor);

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Spawn HTTP REST API server if enabled
    if config.http.enabled {
        let http_state = state.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = pagestash_server::http::start_http_server(http_state, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    let result = server::run_unix_server(&socket_path, state.clone(), tx.subscribe()).await;

    state.registry.shutdown();
    result
}
