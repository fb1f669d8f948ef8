//! Checkout Session Construction
//!
//! Builds the parameters sent to Stripe, with correlation metadata attached
//! wherever an asynchronous webhook consumer may look for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CheckoutMode;
use crate::error::{PaymentError, Result};

/// Placeholder Stripe replaces with the real session id on redirect
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Query parameter a payment link reads as its correlation field
pub const CLIENT_REFERENCE_PARAM: &str = "client_reference_id";

/// Identifiers that let a webhook consumer attribute a payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationMetadata {
    pub subject_id: String,
    pub plan: String,
}

impl CorrelationMetadata {
    pub fn new(subject_id: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            plan: plan.into(),
        }
    }

    /// Write into a metadata container; writing twice leaves the same values
    pub fn write_into(&self, metadata: &mut BTreeMap<String, String>) {
        metadata.insert("subjectId".into(), self.subject_id.clone());
        metadata.insert("userId".into(), self.subject_id.clone());
        metadata.insert("plan".into(), self.plan.clone());
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        self.write_into(&mut metadata);
        metadata
    }
}

/// One checkout line item
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub price: String,
    pub quantity: u32,
}

/// Nested `*_data` container carrying only metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetadataContainer {
    pub metadata: BTreeMap<String, String>,
}

/// Parameters for `POST /v1/checkout/sessions`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionParams {
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub line_items: Vec<LineItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_reference_id: Option<String>,

    /// Session-level metadata (`checkout.session.*` events)
    pub metadata: BTreeMap<String, String>,

    /// Subscription-level metadata (`invoice.*`, `customer.subscription.*` events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_data: Option<MetadataContainer>,

    /// Payment-intent metadata (`payment_intent.*`, `charge.*` events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_data: Option<MetadataContainer>,
}

impl CheckoutSessionParams {
    /// Build parameters for a single price with correlation metadata in every container
    pub fn new(
        mode: CheckoutMode,
        price: &str,
        success_url: &str,
        cancel_url: &str,
        correlation: &CorrelationMetadata,
    ) -> Self {
        let container = MetadataContainer {
            metadata: correlation.to_map(),
        };

        let (subscription_data, payment_intent_data) = match mode {
            CheckoutMode::Subscription => (Some(container), None),
            CheckoutMode::Payment => (None, Some(container)),
        };

        Self {
            mode,
            success_url: with_session_placeholder(success_url),
            cancel_url: cancel_url.to_string(),
            line_items: vec![LineItem {
                price: price.to_string(),
                quantity: 1,
            }],
            client_reference_id: Some(correlation.subject_id.clone()),
            metadata: correlation.to_map(),
            subscription_data,
            payment_intent_data,
        }
    }

    /// Every metadata container this request populates
    pub fn metadata_containers(&self) -> Vec<&BTreeMap<String, String>> {
        let mut containers = vec![&self.metadata];
        containers.extend(self.subscription_data.as_ref().map(|c| &c.metadata));
        containers.extend(self.payment_intent_data.as_ref().map(|c| &c.metadata));
        containers
    }
}

/// A session Stripe created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session id (`cs_...`); absent for payment links
    pub id: Option<String>,

    /// Hosted checkout URL to redirect the user to
    pub url: String,
}

/// Append `session_id={CHECKOUT_SESSION_ID}` unless already present.
///
/// The placeholder must reach Stripe with its braces intact, so this is
/// string concatenation rather than `Url` query manipulation.
pub fn with_session_placeholder(success_url: &str) -> String {
    if success_url.contains(SESSION_ID_PLACEHOLDER) {
        return success_url.to_string();
    }

    let (base, fragment) = match success_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (success_url, None),
    };
    let separator = if base.contains('?') {
        if base.ends_with('?') || base.ends_with('&') { "" } else { "&" }
    } else {
        "?"
    };

    let mut url = format!("{base}{separator}session_id={SESSION_ID_PLACEHOLDER}");
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Parse a redirect destination; only absolute http(s) URLs are accepted
pub fn validate_redirect(key: &'static str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|_| PaymentError::InvalidRedirect { key })?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(PaymentError::InvalidRedirect { key }),
    }
}

/// Payment link URL carrying the subject id in its correlation field
pub fn payment_link_url(link: &str, correlation: &CorrelationMetadata) -> Result<String> {
    let mut url = Url::parse(link).map_err(|_| PaymentError::Config("payment link is not a URL".into()))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != CLIENT_REFERENCE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CLIENT_REFERENCE_PARAM, &correlation.subject_id);

    Ok(url.into())
}
