//! Plan Catalog
//!
//! Maps plan names (`bronze`, `silver`, `gold`, ...) to what Stripe needs to
//! sell them: a price id for checkout sessions, or a pre-built payment link.

use std::collections::BTreeMap;

/// Default plan set when `PLANS` is not configured
pub const DEFAULT_PLANS: &[&str] = &["bronze", "silver", "gold"];

/// Reference to the Stripe resource backing a plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PriceRef {
    /// Price id (`price_...`) used as a checkout line item
    Price(String),

    /// Payment link URL (`https://buy.stripe.com/...`)
    PaymentLink(String),
}

impl PriceRef {
    pub fn as_str(&self) -> &str {
        match self {
            PriceRef::Price(id) => id,
            PriceRef::PaymentLink(url) => url,
        }
    }
}

/// Which kind of reference a catalog is loaded with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceKind {
    /// `PRICE_<PLAN>` keys
    Price,

    /// `PAYMENT_LINK_<PLAN>` keys
    PaymentLink,
}

impl PriceKind {
    /// Env key holding the reference for a plan
    pub fn key_for(self, plan: &str) -> String {
        match self {
            PriceKind::Price => format!("PRICE_{}", plan.to_uppercase()),
            PriceKind::PaymentLink => format!("PAYMENT_LINK_{}", plan.to_uppercase()),
        }
    }

    fn wrap(self, value: String) -> PriceRef {
        match self {
            PriceKind::Price => PriceRef::Price(value),
            PriceKind::PaymentLink => PriceRef::PaymentLink(value),
        }
    }
}

/// Immutable plan → price mapping, loaded once at startup
#[derive(Clone, Debug, Default)]
pub struct PlanCatalog {
    /// Every configured plan name, in configuration order
    names: Vec<String>,

    /// Plans whose price reference is present
    prices: BTreeMap<String, PriceRef>,
}

impl PlanCatalog {
    /// Build a catalog from plan names and a key lookup.
    ///
    /// A plan without a usable value is still listed in `names()` but never resolves.
    pub fn load<F>(names: &[String], kind: PriceKind, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut prices = BTreeMap::new();

        for name in names {
            if let Some(value) = lookup(&kind.key_for(name)) {
                prices.insert(name.clone(), kind.wrap(value));
            }
        }

        Self {
            names: names.to_vec(),
            prices,
        }
    }

    /// Look up a plan; `None` for unknown plans and plans with no price configured
    pub fn resolve(&self, plan: &str) -> Option<&PriceRef> {
        self.prices.get(plan)
    }

    /// Configured plan names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the named plan has a price configured
    pub fn is_configured(&self, plan: &str) -> bool {
        self.prices.contains_key(plan)
    }
}
