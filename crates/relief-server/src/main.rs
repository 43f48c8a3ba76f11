mod config;

use std::sync::Arc;

use relief_api::{AppStateInner, router};
use relief_core::gateway::{PaymentGateway, SandboxGateway, StripeGateway};
use relief_core::{DonationLedger, RequestService};
use relief_db::Database;
use tracing::{info, warn};

use crate::config::{Config, Environment, GatewayChoice};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relief=debug,relief_api=debug,relief_core=debug,relief_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.environment == Environment::Development {
        warn!("Running in development mode");
    }

    let db = Arc::new(Database::open(&config.db_path)?);

    let gateway: Arc<dyn PaymentGateway> = match &config.gateway {
        GatewayChoice::Sandbox => {
            info!("Using the sandbox payment gateway");
            Arc::new(SandboxGateway)
        }
        GatewayChoice::Stripe { api_base, secret_key } => {
            info!("Using Stripe at {}", api_base);
            Arc::new(StripeGateway::new(api_base, secret_key, &config.currency))
        }
    };

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        ledger: DonationLedger::new(db.clone(), gateway, config.limits),
        requests: RequestService::new(db),
        jwt_secret: config.jwt_secret.clone(),
        token_ttl_days: config.token_ttl_days,
    });

    let app = router(state);

    info!("Relief server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relief server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
