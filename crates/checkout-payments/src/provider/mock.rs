//! Mock Checkout Provider
//!
//! For testing and local demos. Records every request and never touches the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::CheckoutProvider;
use crate::error::{PaymentError, Result};
use crate::session::{CheckoutSession, CheckoutSessionParams};

#[derive(Clone, Debug)]
enum Outcome {
    Session(CheckoutSession),
    Rejected { status: u16, detail: Value },
    Timeout,
}

/// Mock provider with a fixed outcome
pub struct MockCheckoutProvider {
    outcome: Outcome,
    calls: AtomicUsize,
    requests: Mutex<Vec<CheckoutSessionParams>>,
}

impl Default for MockCheckoutProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCheckoutProvider {
    /// Succeeds with session `cs_test_abc`
    pub fn new() -> Self {
        Self::with_session("cs_test_abc", "https://checkout.stripe.com/pay/cs_test_abc")
    }

    pub fn with_session(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::from_outcome(Outcome::Session(CheckoutSession {
            id: Some(id.into()),
            url: url.into(),
        }))
    }

    /// Fails the way Stripe does on a 4xx/5xx
    pub fn rejecting(status: u16, detail: Value) -> Self {
        Self::from_outcome(Outcome::Rejected { status, detail })
    }

    /// Fails as if the call timed out
    pub fn timing_out() -> Self {
        Self::from_outcome(Outcome::Timeout)
    }

    fn from_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `create_session` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<CheckoutSessionParams> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl CheckoutProvider for MockCheckoutProvider {
    async fn create_session(&self, params: &CheckoutSessionParams) -> Result<CheckoutSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.clone());

        match &self.outcome {
            Outcome::Session(session) => Ok(session.clone()),
            Outcome::Rejected { status, detail } => Err(PaymentError::Provider {
                status: *status,
                detail: detail.clone(),
            }),
            Outcome::Timeout => Err(PaymentError::ProviderTimeout),
        }
    }

    fn name(&self) -> &str {
        "MockStripe"
    }
}
