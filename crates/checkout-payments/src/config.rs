//! Checkout Configuration
//!
//! Loaded once at startup from the environment and shared read-only by every
//! request. Values are trimmed on load: hosting dashboards are prone to
//! trailing spaces and newlines from copy-paste.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;

use crate::error::{PaymentError, Result};
use crate::plan::{DEFAULT_PLANS, PlanCatalog, PriceKind};

/// Keys without which no checkout can be attempted
pub const REQUIRED_KEYS: [&str; 3] = ["STRIPE_SECRET_KEY", "SUCCESS_URL", "CANCEL_URL"];

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Stripe checkout mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// Recurring subscription
    #[default]
    Subscription,

    /// One-time payment
    Payment,
}

/// HTTP method the checkout endpoint accepts (besides `OPTIONS`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckoutMethod {
    Get,
    #[default]
    Post,
}

impl CheckoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMethod::Get => "GET",
            CheckoutMethod::Post => "POST",
        }
    }
}

/// How a successful checkout is returned to the caller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// `200 { ok: true, url, id }`
    #[default]
    Json,

    /// `302` with `Location` set to the checkout URL
    Redirect,
}

/// Where correlation data is attached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorrelationStrategy {
    /// Create a checkout session and write metadata server-side
    #[default]
    SessionMetadata,

    /// Append `client_reference_id` to a pre-built payment link
    PaymentLink,
}

impl CorrelationStrategy {
    /// Which catalog keys this strategy reads
    pub fn price_kind(&self) -> PriceKind {
        match self {
            CorrelationStrategy::SessionMetadata => PriceKind::Price,
            CorrelationStrategy::PaymentLink => PriceKind::PaymentLink,
        }
    }
}

fn parse_error(key: &str, value: &str) -> PaymentError {
    PaymentError::Config(format!("{key} has unsupported value '{value}'"))
}

impl FromStr for CheckoutMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "subscription" => Ok(CheckoutMode::Subscription),
            "payment" => Ok(CheckoutMode::Payment),
            _ => Err(parse_error("CHECKOUT_MODE", s)),
        }
    }
}

impl FromStr for CheckoutMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(CheckoutMethod::Get),
            "POST" => Ok(CheckoutMethod::Post),
            _ => Err(parse_error("CHECKOUT_METHOD", s)),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ResponseMode::Json),
            "redirect" => Ok(ResponseMode::Redirect),
            _ => Err(parse_error("RESPONSE_MODE", s)),
        }
    }
}

impl FromStr for CorrelationStrategy {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "session_metadata" | "metadata" => Ok(CorrelationStrategy::SessionMetadata),
            "payment_link" | "link" => Ok(CorrelationStrategy::PaymentLink),
            _ => Err(parse_error("CORRELATION_STRATEGY", s)),
        }
    }
}

/// External identity convention for subject ids
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectRule {
    /// Required leading characters (LINE user ids start with `U`)
    pub prefix: String,

    /// Minimum total length, if enforced
    pub min_length: Option<usize>,
}

impl Default for SubjectRule {
    fn default() -> Self {
        Self {
            prefix: "U".into(),
            min_length: None,
        }
    }
}

/// Cross-origin allow-list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AllowOrigins {
    /// `Access-Control-Allow-Origin: *`
    #[default]
    Any,

    /// Reflect the request origin when listed
    List(Vec<String>),
}

impl AllowOrigins {
    fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowOrigins::Any
        } else {
            AllowOrigins::List(origins)
        }
    }
}

/// Immutable service configuration
#[derive(Debug)]
pub struct CheckoutConfig {
    /// Stripe secret key (`sk_...`)
    pub secret_key: Option<SecretString>,

    /// Redirect after successful payment
    pub success_url: Option<String>,

    /// Redirect if checkout is cancelled
    pub cancel_url: Option<String>,

    /// Plan → price/link mapping
    pub plans: PlanCatalog,

    pub mode: CheckoutMode,
    pub method: CheckoutMethod,
    pub response_mode: ResponseMode,
    pub correlation: CorrelationStrategy,
    pub subject_rule: SubjectRule,
    pub allow_origins: AllowOrigins,

    /// Upper bound on the Stripe call
    pub provider_timeout: Duration,

    /// Stripe API base URL
    pub api_base: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            success_url: None,
            cancel_url: None,
            plans: PlanCatalog::default(),
            mode: CheckoutMode::default(),
            method: CheckoutMethod::default(),
            response_mode: ResponseMode::default(),
            correlation: CorrelationStrategy::default(),
            subject_rule: SubjectRule::default(),
            allow_origins: AllowOrigins::default(),
            provider_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

/// Trim a raw value; blank counts as absent
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CheckoutConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| clean(lookup(key));

        let plan_names: Vec<String> = match get("PLANS") {
            Some(list) => list
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            None => DEFAULT_PLANS.iter().map(|p| p.to_string()).collect(),
        };

        let correlation = get("CORRELATION_STRATEGY")
            .map(|v| v.parse::<CorrelationStrategy>())
            .transpose()?
            .unwrap_or_default();

        let plans = PlanCatalog::load(&plan_names, correlation.price_kind(), &get);

        let min_length = get("SUBJECT_MIN_LENGTH")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| parse_error("SUBJECT_MIN_LENGTH", &v))
            })
            .transpose()?;

        let timeout_secs = get("PROVIDER_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| parse_error("PROVIDER_TIMEOUT_SECS", &v))
            })
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            secret_key: get("STRIPE_SECRET_KEY").map(SecretString::from),
            success_url: get("SUCCESS_URL"),
            cancel_url: get("CANCEL_URL"),
            plans,
            mode: get("CHECKOUT_MODE")
                .map(|v| v.parse::<CheckoutMode>())
                .transpose()?
                .unwrap_or_default(),
            method: get("CHECKOUT_METHOD")
                .map(|v| v.parse::<CheckoutMethod>())
                .transpose()?
                .unwrap_or_default(),
            response_mode: get("RESPONSE_MODE")
                .map(|v| v.parse::<ResponseMode>())
                .transpose()?
                .unwrap_or_default(),
            correlation,
            subject_rule: SubjectRule {
                prefix: get("SUBJECT_PREFIX").unwrap_or_else(|| "U".into()),
                min_length,
            },
            allow_origins: get("CORS_ALLOW_ORIGINS")
                .map(|v| AllowOrigins::parse(&v))
                .unwrap_or_default(),
            provider_timeout: Duration::from_secs(timeout_secs),
            api_base: get("STRIPE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
        })
    }

    /// Whether a required key is set
    fn has(&self, key: &str) -> bool {
        match key {
            "STRIPE_SECRET_KEY" => self.secret_key.is_some(),
            "SUCCESS_URL" => self.success_url.is_some(),
            "CANCEL_URL" => self.cancel_url.is_some(),
            _ => false,
        }
    }

    /// Fail with the first required key that is missing
    pub fn ensure_complete(&self) -> Result<()> {
        match REQUIRED_KEYS.into_iter().find(|key| !self.has(key)) {
            Some(key) => Err(PaymentError::MissingConfig { key }),
            None => Ok(()),
        }
    }

    /// Presence of every key the service reads, values never included
    pub fn presence(&self) -> Vec<(String, bool)> {
        let kind = self.correlation.price_kind();
        let mut flags: Vec<(String, bool)> = REQUIRED_KEYS
            .iter()
            .map(|key| (key.to_string(), self.has(key)))
            .collect();

        flags.extend(
            self.plans
                .names()
                .iter()
                .map(|plan| (kind.key_for(plan), self.plans.is_configured(plan))),
        );
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_values_are_trimmed() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            ("STRIPE_SECRET_KEY", " sk_test_123\n"),
            ("SUCCESS_URL", "https://example.com/success.html\r\n"),
            ("CANCEL_URL", "\thttps://example.com/cancel.html "),
            ("PRICE_BRONZE", "price_b \n"),
        ]))
        .unwrap();

        assert_eq!(config.success_url.as_deref(), Some("https://example.com/success.html"));
        assert_eq!(config.cancel_url.as_deref(), Some("https://example.com/cancel.html"));
        assert_eq!(config.plans.resolve("bronze").map(|p| p.as_str()), Some("price_b"));
        assert!(config.ensure_complete().is_ok());
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("SUCCESS_URL", "   \n"),
            ("CANCEL_URL", "https://example.com/cancel"),
        ]))
        .unwrap();

        match config.ensure_complete() {
            Err(PaymentError::MissingConfig { key }) => assert_eq!(key, "SUCCESS_URL"),
            other => panic!("expected missing SUCCESS_URL, got {other:?}"),
        }
    }

    #[test]
    fn test_first_missing_key_wins() {
        let config = CheckoutConfig::from_lookup(lookup(&[])).unwrap();
        match config.ensure_complete() {
            Err(PaymentError::MissingConfig { key }) => assert_eq!(key, "STRIPE_SECRET_KEY"),
            other => panic!("expected missing STRIPE_SECRET_KEY, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, CheckoutMode::Subscription);
        assert_eq!(config.method, CheckoutMethod::Post);
        assert_eq!(config.response_mode, ResponseMode::Json);
        assert_eq!(config.correlation, CorrelationStrategy::SessionMetadata);
        assert_eq!(config.allow_origins, AllowOrigins::Any);
        assert_eq!(config.subject_rule, SubjectRule::default());
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.api_base, "https://api.stripe.com");
        assert_eq!(config.plans.names(), ["bronze", "silver", "gold"]);
    }

    #[test]
    fn test_custom_plans_and_modes() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            ("PLANS", "Starter, pro ,"),
            ("PRICE_PRO", "price_pro"),
            ("CHECKOUT_MODE", "payment"),
            ("CHECKOUT_METHOD", "get"),
            ("RESPONSE_MODE", "Redirect"),
            ("SUBJECT_MIN_LENGTH", "33"),
            ("CORS_ALLOW_ORIGINS", "https://a.example, https://b.example/"),
        ]))
        .unwrap();

        assert_eq!(config.plans.names(), ["starter", "pro"]);
        assert!(config.plans.resolve("pro").is_some());
        assert!(config.plans.resolve("starter").is_none());
        assert_eq!(config.mode, CheckoutMode::Payment);
        assert_eq!(config.method, CheckoutMethod::Get);
        assert_eq!(config.response_mode, ResponseMode::Redirect);
        assert_eq!(config.subject_rule.min_length, Some(33));
        assert_eq!(
            config.allow_origins,
            AllowOrigins::List(vec!["https://a.example".into(), "https://b.example".into()])
        );
    }

    #[test]
    fn test_unsupported_value_is_config_error() {
        let result = CheckoutConfig::from_lookup(lookup(&[("CHECKOUT_MODE", "setup")]));
        assert!(matches!(result, Err(PaymentError::Config(_))));

        let result = CheckoutConfig::from_lookup(lookup(&[("PROVIDER_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_presence_flags() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("PRICE_GOLD", "price_g"),
        ]))
        .unwrap();

        let flags: HashMap<String, bool> = config.presence().into_iter().collect();
        assert!(flags["STRIPE_SECRET_KEY"]);
        assert!(!flags["SUCCESS_URL"]);
        assert!(!flags["PRICE_BRONZE"]);
        assert!(flags["PRICE_GOLD"]);
        assert_eq!(flags.len(), 6);
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = CheckoutConfig::from_lookup(lookup(&[("STRIPE_SECRET_KEY", "sk_live_secret")]))
            .unwrap();
        assert!(!format!("{config:?}").contains("sk_live_secret"));
    }
}
