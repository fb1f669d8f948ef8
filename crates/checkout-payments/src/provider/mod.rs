//! Checkout Providers
//!
//! Abstraction over the payment provider's session-creation API.

mod mock;
mod stripe;

pub use mock::MockCheckoutProvider;
pub use stripe::StripeClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{CheckoutSession, CheckoutSessionParams};

/// Payment provider trait (Strategy pattern)
///
/// One call per checkout attempt; implementations must not retry.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a hosted checkout session
    async fn create_session(&self, params: &CheckoutSessionParams) -> Result<CheckoutSession>;

    /// Provider name
    fn name(&self) -> &str;
}
