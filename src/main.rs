//! Folio - headless content backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{
    auth::JwtValidator,
    config::Args,
    db::{Database, MemoryStore, MongoStore},
    server::{self, AppState},
    services,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("folio={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Folio - headless content backend");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_COMMIT_SHORT"));
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Schema: {}", if args.strict_schema { "strict" } else { "advisory" });
    if args.memory_store {
        info!("Store: in-memory");
    } else {
        info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let db = if args.memory_store {
        Database::new(Arc::new(MemoryStore::new()), args.store_timeout())
    } else {
        match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                Database::new(Arc::new(store), args.store_timeout())
            }
            Err(e) if args.dev_mode => {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Database::new(Arc::new(MemoryStore::new()), args.store_timeout())
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let jwt = match args.jwt_secret.clone() {
        Some(secret) if !secret.is_empty() => JwtValidator::new(secret, args.jwt_expiry_seconds)?,
        _ => {
            warn!("No JWT_SECRET set - signing tokens with the development secret");
            JwtValidator::new_dev()
        }
    };

    let state = AppState::new(args, db, jwt);

    if let Err(e) = services::bootstrap(&state.db, &state.services, &state.args.seed_config()).await {
        error!("Bootstrap failed: {}", e);
        std::process::exit(1);
    }

    server::run(Arc::new(state)).await?;
    Ok(())
}
