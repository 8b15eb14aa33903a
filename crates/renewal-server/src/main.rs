//! Membership Renewal HTTP Server
//!
//! Axum-based server running the renewal flow against PostgreSQL and the
//! Stripe hosted checkout. Serves HTTPS when a certificate pair is
//! configured, plain HTTP otherwise.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use renewal_payments::StripeGateway;
use renewal_server::build_router;
use renewal_server::config::Config;
use renewal_server::coordinator::SaleCoordinator;
use renewal_server::state::AppState;
use renewal_server::templates::TemplateRegistry;
use renewal_store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Parse the pages; a bad template stops the boot
    let templates = Arc::new(TemplateRegistry::load()?);

    // Connect and migrate
    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    tracing::info!("✓ Connected to PostgreSQL, migrations applied");

    let gateway = Arc::new(StripeGateway::new(&config.stripe_secret_key));
    tracing::info!("✓ Stripe configured");

    let coordinator = Arc::new(SaleCoordinator::new(
        store,
        gateway,
        config.fees,
        config.base_url(),
    ));

    let state = AppState {
        coordinator,
        templates,
    };
    let app = build_router(state);

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 renewal server running on {}", config.base_url());
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /displayPaymentForm - Renewal form");
    tracing::info!("  POST /displayPaymentForm - Validate and show the costs");
    tracing::info!("  POST /checkout           - Redirect to the payment page");
    tracing::info!("  GET  /success            - Complete a paid renewal");
    tracing::info!("  GET  /cancel             - Cancelled payment");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("");

    match &config.tls {
        Some(tls) => {
            let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &tls.cert_path,
                &tls.key_path,
            )
            .await?;
            axum_server::bind_rustls(config.bind_addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
