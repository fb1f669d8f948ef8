//! Application State

use checkout_payments::{CheckoutConfig, CheckoutService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout pipeline with its immutable configuration
    pub service: CheckoutService,

    /// Whether a Stripe client could be built at startup
    pub stripe_configured: bool,
}

impl AppState {
    pub fn config(&self) -> &CheckoutConfig {
        self.service.config()
    }
}
