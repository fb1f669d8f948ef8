//! Checkout Pipeline
//!
//! Validation → plan resolution → session construction → correlated result.
//! Every gate fails fast; the provider is called at most once and only after
//! all caller input and configuration has been checked.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::config::CheckoutConfig;
use crate::error::{PaymentError, Result};
use crate::input::{CheckoutInput, ValidatedInput};
use crate::plan::PriceRef;
use crate::provider::CheckoutProvider;
use crate::session::{
    CheckoutSession, CheckoutSessionParams, CorrelationMetadata, payment_link_url,
    validate_redirect,
};

/// Configuration diagnostics returned for the `debug` plan
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    /// Key → whether it is set; values are never included
    pub env: Map<String, Value>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub origin: Option<String>,
}

/// Successful pipeline result
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutOutcome {
    /// Redirect the caller to a hosted checkout
    Redirect(CheckoutSession),

    /// Diagnostics for the `debug` plan
    Debug(DebugReport),
}

/// The checkout request handler, independent of any HTTP framework
#[derive(Clone)]
pub struct CheckoutService {
    config: Arc<CheckoutConfig>,
    provider: Option<Arc<dyn CheckoutProvider>>,
}

impl CheckoutService {
    pub fn new(config: Arc<CheckoutConfig>, provider: Option<Arc<dyn CheckoutProvider>>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Configuration completeness gate; runs before the request body is read
    pub fn ensure_configured(&self) -> Result<()> {
        self.config.ensure_complete().inspect_err(|e| {
            tracing::error!("Checkout misconfigured: {}", e);
        })
    }

    /// Run the pipeline for extracted input.
    ///
    /// `origin` is the caller's `Origin` header, echoed only in debug output.
    pub async fn checkout(&self, input: &CheckoutInput, origin: Option<&str>) -> Result<CheckoutOutcome> {
        self.ensure_configured()?;

        let input = input.validate(&self.config.subject_rule).inspect_err(|e| {
            tracing::warn!("Rejected checkout input: {}", e);
        })?;

        if input.is_debug() {
            tracing::info!(subject_id = %input.subject_id, "Returning configuration diagnostics");
            return Ok(CheckoutOutcome::Debug(self.debug_report(origin)));
        }

        let span = tracing::info_span!(
            "checkout",
            subject_id = %input.subject_id,
            plan = %input.plan,
        );

        self.create(input).instrument(span).await.map(CheckoutOutcome::Redirect)
    }

    async fn create(&self, input: ValidatedInput) -> Result<CheckoutSession> {
        let price = self.config.plans.resolve(&input.plan).ok_or_else(|| {
            tracing::warn!("Plan not configured");
            PaymentError::InvalidPlan { plan: input.plan.clone() }
        })?;

        let success_url = self.required_url("SUCCESS_URL", self.config.success_url.as_deref())?;
        let cancel_url = self.required_url("CANCEL_URL", self.config.cancel_url.as_deref())?;

        let correlation = CorrelationMetadata::new(input.subject_id, input.plan);

        match price {
            PriceRef::PaymentLink(link) => {
                let url = payment_link_url(link, &correlation)?;
                tracing::info!("Payment link prepared");
                Ok(CheckoutSession { id: None, url })
            }
            PriceRef::Price(price) => {
                let params = CheckoutSessionParams::new(
                    self.config.mode,
                    price,
                    success_url,
                    cancel_url,
                    &correlation,
                );
                self.create_session(&params).await
            }
        }
    }

    async fn create_session(&self, params: &CheckoutSessionParams) -> Result<CheckoutSession> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(PaymentError::MissingConfig { key: "STRIPE_SECRET_KEY" })?;

        let session = provider.create_session(params).await.inspect_err(|e| {
            tracing::error!(provider = provider.name(), "Checkout session failed: {}", e);
        })?;

        tracing::info!(
            session_id = session.id.as_deref().unwrap_or_default(),
            "Checkout session created"
        );
        Ok(session)
    }

    fn required_url<'a>(&self, key: &'static str, value: Option<&'a str>) -> Result<&'a str> {
        let value = value.ok_or(PaymentError::MissingConfig { key })?;
        validate_redirect(key, value).inspect_err(|_| {
            tracing::error!("{} is not an absolute URL", key);
        })?;
        Ok(value)
    }

    fn debug_report(&self, origin: Option<&str>) -> DebugReport {
        DebugReport {
            env: self
                .config
                .presence()
                .into_iter()
                .map(|(key, set)| (key, Value::Bool(set)))
                .collect(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
            origin: origin.map(str::to_owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutMode;
    use crate::provider::MockCheckoutProvider;
    use std::collections::HashMap;

    const SUBJECT: &str = "U1234567890123456789";

    fn config(extra: &[(&str, &str)], without: &[&str]) -> CheckoutConfig {
        let mut env: HashMap<String, String> = [
            ("STRIPE_SECRET_KEY", "sk_test_secret"),
            ("PRICE_BRONZE", "price_bronze"),
            ("PRICE_SILVER", "price_silver"),
            ("PRICE_GOLD", "price_gold"),
            ("SUCCESS_URL", "https://line-pay.example/success.html"),
            ("CANCEL_URL", "https://line-pay.example/cancel.html"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        for k in without {
            env.remove(*k);
        }
        CheckoutConfig::from_lookup(|k| env.get(k).cloned()).unwrap()
    }

    fn service(config: CheckoutConfig, provider: &Arc<MockCheckoutProvider>) -> CheckoutService {
        let provider: Arc<dyn CheckoutProvider> = provider.clone();
        CheckoutService::new(Arc::new(config), Some(provider))
    }

    fn input(subject: &str, plan: &str) -> CheckoutInput {
        CheckoutInput {
            subject_id: Some(subject.into()),
            plan: Some(plan.into()),
        }
    }

    #[tokio::test]
    async fn test_valid_checkout() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &[]), &provider);

        let outcome = service.checkout(&input(SUBJECT, "bronze"), None).await.unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Redirect(CheckoutSession {
                id: Some("cs_test_abc".into()),
                url: "https://checkout.stripe.com/pay/cs_test_abc".into(),
            })
        );
        assert_eq!(provider.calls(), 1);

        let params = provider.last_request().unwrap();
        assert_eq!(params.mode, CheckoutMode::Subscription);
        assert_eq!(params.line_items[0].price, "price_bronze");
        assert_eq!(params.line_items[0].quantity, 1);
        assert_eq!(
            params.success_url,
            "https://line-pay.example/success.html?session_id={CHECKOUT_SESSION_ID}"
        );
        for metadata in params.metadata_containers() {
            assert_eq!(metadata["subjectId"], SUBJECT);
            assert_eq!(metadata["plan"], "bronze");
        }
    }

    #[tokio::test]
    async fn test_every_configured_plan_resolves() {
        for plan in ["bronze", "silver", "gold"] {
            let provider = Arc::new(MockCheckoutProvider::new());
            let service = service(config(&[], &[]), &provider);
            let outcome = service.checkout(&input(SUBJECT, plan), None).await.unwrap();

            let CheckoutOutcome::Redirect(session) = outcome else {
                panic!("expected redirect for {plan}");
            };
            assert!(session.url.starts_with("https://checkout.stripe.com/"));
            assert_eq!(provider.last_request().unwrap().line_items[0].price, format!("price_{plan}"));
        }
    }

    #[tokio::test]
    async fn test_unknown_plan_never_calls_provider() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &[]), &provider);

        let err = service.checkout(&input(SUBJECT, "platinum"), None).await.unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(err.context()["plan"], "platinum");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_price_is_invalid_plan() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &["PRICE_BRONZE"]), &provider);

        let err = service.checkout(&input(SUBJECT, "bronze"), None).await.unwrap_err();

        assert!(matches!(err, PaymentError::InvalidPlan { .. }));
        assert_eq!(err.status_code(), 400);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_subject_never_calls_provider() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &[]), &provider);

        for subject in ["", "   ", "u123", "X1234567890123456789"] {
            let err = service.checkout(&input(subject, "bronze"), None).await.unwrap_err();
            assert_eq!(err.status_code(), 400, "subject {subject:?}");
        }
        let err = service.checkout(&CheckoutInput::default(), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingSubject { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_debug_reports_presence_only() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &["PRICE_GOLD"]), &provider);

        let outcome = service
            .checkout(&input(SUBJECT, "debug"), Some("https://liff.line.me"))
            .await
            .unwrap();

        let CheckoutOutcome::Debug(report) = outcome else {
            panic!("expected debug report");
        };
        assert_eq!(report.env["STRIPE_SECRET_KEY"], Value::Bool(true));
        assert_eq!(report.env["PRICE_GOLD"], Value::Bool(false));
        assert_eq!(report.origin.as_deref(), Some("https://liff.line.me"));
        assert_eq!(report.success_url.as_deref(), Some("https://line-pay.example/success.html"));

        let rendered = serde_json::to_string(&report).unwrap();
        assert!(!rendered.contains("sk_test_secret"));
        assert!(!rendered.contains("price_bronze"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_config_fails_first() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[], &["CANCEL_URL"]), &provider);

        let err = service.checkout(&input("", "platinum"), None).await.unwrap_err();

        assert!(matches!(err, PaymentError::MissingConfig { key: "CANCEL_URL" }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_relative_redirect_is_config_error() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[("SUCCESS_URL", "/success.html")], &[]), &provider);

        let err = service.checkout(&input(SUBJECT, "bronze"), None).await.unwrap_err();

        assert!(matches!(err, PaymentError::InvalidRedirect { key: "SUCCESS_URL" }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_forwarded() {
        let detail = serde_json::json!({ "error": { "message": "No such price" } });
        let provider = Arc::new(MockCheckoutProvider::rejecting(404, detail.clone()));
        let service = service(config(&[], &[]), &provider);

        let err = service.checkout(&input(SUBJECT, "gold"), None).await.unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.context()["detail"], detail);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_payment_mode() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(config(&[("CHECKOUT_MODE", "payment")], &[]), &provider);

        service.checkout(&input(SUBJECT, "silver"), None).await.unwrap();

        let params = provider.last_request().unwrap();
        assert_eq!(params.mode, CheckoutMode::Payment);
        assert!(params.subscription_data.is_none());
        assert_eq!(params.payment_intent_data.unwrap().metadata["subjectId"], SUBJECT);
    }

    #[tokio::test]
    async fn test_payment_link_strategy() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let service = service(
            config(
                &[
                    ("CORRELATION_STRATEGY", "payment_link"),
                    ("PAYMENT_LINK_BRONZE", "https://buy.stripe.com/test_bronze"),
                ],
                &[],
            ),
            &provider,
        );

        let outcome = service.checkout(&input(SUBJECT, "bronze"), None).await.unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Redirect(CheckoutSession {
                id: None,
                url: format!("https://buy.stripe.com/test_bronze?client_reference_id={SUBJECT}"),
            })
        );
        assert_eq!(provider.calls(), 0);

        let err = service.checkout(&input(SUBJECT, "gold"), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPlan { .. }));
    }

    #[tokio::test]
    async fn test_no_provider_is_config_error() {
        let service = CheckoutService::new(Arc::new(config(&[], &[])), None);
        let err = service.checkout(&input(SUBJECT, "bronze"), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingConfig { key: "STRIPE_SECRET_KEY" }));
    }
}
