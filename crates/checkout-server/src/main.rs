//! Checkout HTTP Server
//!
//! Axum-based endpoint turning `(subjectId, plan)` into a Stripe checkout
//! redirect. Configuration is read once at startup.

mod cors;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{CheckoutConfig, CheckoutProvider, CheckoutService, StripeClient};

use crate::handlers::{create_checkout, health_check};
use crate::state::AppState;

/// Build the router; shared by `main` and the handler tests
pub(crate) fn app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "http",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %uuid::Uuid::new_v4(),
        )
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/create-checkout-session", any(create_checkout))
        .route("/api/checkout", any(create_checkout))
        .layer(middleware::from_fn_with_state(state.clone(), cors::cors))
        .layer(trace)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CheckoutConfig::from_env()?;

    let stripe: Option<Arc<dyn CheckoutProvider>> = match StripeClient::from_config(&config) {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - checkout requests will fail: {}", e);
            None
        }
    };

    if let Err(e) = config.ensure_complete() {
        tracing::warn!("⚠ {}", e);
    }
    for (key, set) in config.presence() {
        tracing::info!("  {:<20} {}", key, if set { "set" } else { "missing" });
    }

    let state = AppState {
        stripe_configured: stripe.is_some(),
        service: CheckoutService::new(Arc::new(config), stripe),
    };

    let app = app(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("checkout server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                   - Health check");
    tracing::info!("  *    /create-checkout-session  - Create Stripe checkout");
    tracing::info!("  *    /api/checkout             - Alias");

    axum::serve(listener, app).await?;

    Ok(())
}
