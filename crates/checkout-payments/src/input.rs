//! Request Input
//!
//! Extraction of the subject id and plan from a query string or JSON body,
//! and validation against the configured identity convention.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::SubjectRule;
use crate::error::{PaymentError, Result};

/// Field names accepted for the subject id, in priority order
pub const SUBJECT_FIELDS: [&str; 4] = ["subjectId", "userId", "line_user_id", "lineUserId"];

/// Plan value that returns configuration diagnostics instead of a checkout
pub const DEBUG_PLAN: &str = "debug";

/// Raw caller input, before validation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutInput {
    pub subject_id: Option<String>,
    pub plan: Option<String>,
}

/// Stringify a scalar JSON value; objects, arrays and null count as absent
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl CheckoutInput {
    /// Extract from query parameters
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            subject_id: SUBJECT_FIELDS
                .iter()
                .find_map(|field| query.get(*field).filter(|v| !v.trim().is_empty()))
                .cloned(),
            plan: query.get("plan").cloned(),
        }
    }

    /// Extract from a parsed JSON body
    pub fn from_json(body: &Value) -> Self {
        let field = |name: &str| body.get(name).and_then(scalar);

        Self {
            subject_id: SUBJECT_FIELDS
                .iter()
                .filter_map(|name| field(*name))
                .find(|v| !v.trim().is_empty()),
            plan: field("plan"),
        }
    }

    /// Extract from a raw POST body; an empty body is an empty object
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(body).map_err(|_| PaymentError::InvalidJson)?;
        Ok(Self::from_json(&value))
    }

    /// Fill fields missing here from `other`
    pub fn or(self, other: Self) -> Self {
        Self {
            subject_id: self.subject_id.or(other.subject_id),
            plan: self.plan.or(other.plan),
        }
    }

    /// Validate into a subject id and a normalized plan name
    pub fn validate(&self, rule: &SubjectRule) -> Result<ValidatedInput> {
        let subject_id = self
            .subject_id
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();

        if subject_id.is_empty() {
            return Err(PaymentError::MissingSubject {
                value: self.subject_id.clone().unwrap_or_default(),
            });
        }

        if !subject_id.starts_with(rule.prefix.as_str()) {
            return Err(PaymentError::InvalidSubject {
                value: subject_id.to_string(),
                reason: format!("must start with '{}'", rule.prefix),
            });
        }

        if let Some(min) = rule.min_length {
            if subject_id.chars().count() < min {
                return Err(PaymentError::InvalidSubject {
                    value: subject_id.to_string(),
                    reason: format!("must be at least {min} characters"),
                });
            }
        }

        let plan = self
            .plan
            .as_deref()
            .map(|p| p.trim().to_lowercase())
            .unwrap_or_default();

        if plan.is_empty() {
            return Err(PaymentError::MissingPlan {
                value: self.plan.clone().unwrap_or_default(),
            });
        }

        Ok(ValidatedInput {
            subject_id: subject_id.to_string(),
            plan,
        })
    }
}

/// Input that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedInput {
    pub subject_id: String,
    pub plan: String,
}

impl ValidatedInput {
    pub fn is_debug(&self) -> bool {
        self.plan == DEBUG_PLAN
    }
}
