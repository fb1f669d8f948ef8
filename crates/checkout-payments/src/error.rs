//! Checkout Error Types

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Checkout-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Subject identifier missing or blank
    #[error("subjectId is required (LINE userId like 'Uxxxx')")]
    MissingSubject { value: String },

    /// Subject identifier does not follow the external identity format
    #[error("subjectId is invalid ({reason})")]
    InvalidSubject { value: String, reason: String },

    /// Plan missing or blank
    #[error("plan is required")]
    MissingPlan { value: String },

    /// Plan not in the catalog, or its price is not configured
    #[error("plan is invalid")]
    InvalidPlan { plan: String },

    /// Request body is not JSON
    #[error("Invalid JSON body")]
    InvalidJson,

    /// Required configuration key missing or blank
    #[error("Missing env: {key}")]
    MissingConfig { key: &'static str },

    /// Redirect destination is not an absolute URL
    #[error("Invalid redirect URL in {key}")]
    InvalidRedirect { key: &'static str },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stripe answered with a non-success status or an unusable body
    #[error("Stripe API error")]
    Provider { status: u16, detail: Value },

    /// Stripe did not answer within the configured timeout
    #[error("Stripe API timeout")]
    ProviderTimeout,

    /// Transport failure talking to Stripe
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request method is not accepted by the endpoint
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl PaymentError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::MissingSubject { .. }
            | PaymentError::InvalidSubject { .. }
            | PaymentError::MissingPlan { .. }
            | PaymentError::InvalidPlan { .. }
            | PaymentError::InvalidJson => 400,
            PaymentError::MethodNotAllowed => 405,
            PaymentError::Provider { status, .. } if (400..=599).contains(status) => *status,
            PaymentError::ProviderTimeout => 504,
            PaymentError::MissingConfig { .. }
            | PaymentError::InvalidRedirect { .. }
            | PaymentError::Config(_)
            | PaymentError::Provider { .. }
            | PaymentError::Http(_) => 500,
        }
    }

    /// Extra fields merged into the JSON error body.
    ///
    /// Only caller input and key names are echoed here, never configuration values.
    pub fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        match self {
            PaymentError::MissingSubject { value } | PaymentError::InvalidSubject { value, .. } => {
                context.insert("subjectId".into(), json!(value));
            }
            PaymentError::MissingPlan { value: plan } | PaymentError::InvalidPlan { plan } => {
                context.insert("plan".into(), json!(plan));
            }
            PaymentError::MissingConfig { key } | PaymentError::InvalidRedirect { key } => {
                context.insert("key".into(), json!(key));
            }
            PaymentError::Provider { detail, .. } => {
                context.insert("detail".into(), detail.clone());
            }
            _ => {}
        }
        context
    }

    /// Full `{ ok: false, error, ...context }` body
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("ok".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(self.to_string()));
        body.extend(self.context());
        Value::Object(body)
    }
}
