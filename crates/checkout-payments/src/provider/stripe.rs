//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach over the REST API:
//! one form-encoded `POST /v1/checkout/sessions` per checkout attempt.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::CheckoutProvider;
use crate::config::CheckoutConfig;
use crate::error::{PaymentError, Result};
use crate::form::to_form;
use crate::session::{CheckoutSession, CheckoutSessionParams};

const SESSIONS_PATH: &str = "/v1/checkout/sessions";

/// Stripe client wrapper
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: SecretString, api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("checkout-payments/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            secret_key,
            api_base: api_base.into(),
        })
    }

    /// Create from loaded configuration
    pub fn from_config(config: &CheckoutConfig) -> Result<Self> {
        let secret_key = config
            .secret_key
            .as_ref()
            .ok_or(PaymentError::MissingConfig { key: "STRIPE_SECRET_KEY" })?;

        Self::new(
            SecretString::from(secret_key.expose_secret().to_owned()),
            config.api_base.clone(),
            config.provider_timeout,
        )
    }

    fn sessions_url(&self) -> String {
        format!("{}{}", self.api_base, SESSIONS_PATH)
    }
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::ProviderTimeout
    } else {
        PaymentError::Http(e)
    }
}

/// Stripe bodies are JSON; anything else is kept verbatim under `raw`
fn parse_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }))
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(&self, params: &CheckoutSessionParams) -> Result<CheckoutSession> {
        let form = to_form(params)?;

        let response = self
            .http
            .post(self.sessions_url())
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = parse_body(response.text().await.map_err(transport_error)?);

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Stripe rejected checkout session");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                detail: body,
            });
        }

        let url = body
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_owned);

        let Some(url) = url else {
            tracing::error!("Stripe returned no checkout URL");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                detail: body,
            });
        };

        Ok(CheckoutSession {
            id: body.get("id").and_then(Value::as_str).map(str::to_owned),
            url,
        })
    }

    fn name(&self) -> &str {
        "Stripe"
    }
}
