//! # checkout-payments
//!
//! Turns a `(subjectId, plan)` request into a hosted Stripe checkout URL,
//! tagged so the payment can be traced back to the subject later.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  LINE/LIFF  │────▶│ CheckoutService  │────▶│  Stripe Hosted  │
//! │  front end  │     │ (this crate)     │     │  Checkout Page  │
//! └─────────────┘     └──────────────────┘     └─────────────────┘
//!                              │                        │
//!                              │  metadata.subjectId    │ webhook
//!                              ▼                        ▼
//!                     session + subscription    checkout.session.completed
//!                     metadata containers       invoice.paid, ...
//! ```
//!
//! ## Correlation strategies
//!
//! ### 1. Session metadata (default)
//!
//! A checkout session is created per request. `subjectId` and `plan` are
//! written to the session metadata and to the subscription (or payment
//! intent) metadata, because `checkout.session.*` and `invoice.*` events
//! expose different containers.
//!
//! ### 2. Payment link
//!
//! Each plan maps to a pre-built payment link; the subject id travels in the
//! link's `client_reference_id` query parameter. No API call is made.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use checkout_payments::{CheckoutConfig, CheckoutInput, CheckoutService, StripeClient};
//!
//! let config = CheckoutConfig::from_env()?;
//! let stripe = StripeClient::from_config(&config)?;
//! let service = CheckoutService::new(Arc::new(config), Some(Arc::new(stripe)));
//!
//! let input = CheckoutInput {
//!     subject_id: Some("U1234567890abcdef1234567890abcdef".into()),
//!     plan: Some("bronze".into()),
//! };
//! let outcome = service.checkout(&input, None).await?;
//! ```

mod checkout;
mod config;
mod error;
mod form;
mod input;
mod plan;
mod provider;
mod session;

pub use checkout::{CheckoutOutcome, CheckoutService, DebugReport};
pub use config::{
    AllowOrigins, CheckoutConfig, CheckoutMethod, CheckoutMode, CorrelationStrategy,
    REQUIRED_KEYS, ResponseMode, SubjectRule,
};
pub use error::{PaymentError, Result};
pub use form::{flatten, to_form};
pub use input::{CheckoutInput, DEBUG_PLAN, SUBJECT_FIELDS, ValidatedInput};
pub use plan::{PlanCatalog, PriceKind, PriceRef};
pub use provider::{CheckoutProvider, MockCheckoutProvider, StripeClient};
pub use session::{CheckoutSession, CheckoutSessionParams, CorrelationMetadata};
