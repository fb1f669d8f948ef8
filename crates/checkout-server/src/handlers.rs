//! HTTP Handlers

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use checkout_payments::{
    CheckoutInput, CheckoutMethod, CheckoutOutcome, CheckoutSession, PaymentError, ResponseMode,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `{ ok: false, error, ...context }` with the error's status
pub struct ApiError(PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_body())).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.stripe_configured,
    })
}

fn method_allowed(configured: CheckoutMethod, method: &Method) -> bool {
    match configured {
        CheckoutMethod::Get => *method == Method::GET,
        CheckoutMethod::Post => *method == Method::POST,
    }
}

fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Create a checkout session and hand back its URL
pub async fn create_checkout(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let config = state.config();

    if !method_allowed(config.method, &method) {
        tracing::warn!(%method, "Checkout method not allowed");
        return Err(PaymentError::MethodNotAllowed.into());
    }

    state.service.ensure_configured()?;

    let query = CheckoutInput::from_query(&parse_query(raw_query.as_deref()));
    let input = match config.method {
        CheckoutMethod::Get => query,
        CheckoutMethod::Post => CheckoutInput::from_body(&body)
            .inspect_err(|_| tracing::warn!("Checkout body is not JSON"))?
            .or(query),
    };

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    match state.service.checkout(&input, origin).await? {
        CheckoutOutcome::Redirect(session) => Ok(redirect_response(config.response_mode, session)),
        CheckoutOutcome::Debug(report) => {
            let mut body = json!({ "ok": true, "debug": true });
            if let (Value::Object(body), Ok(Value::Object(report))) =
                (&mut body, serde_json::to_value(report))
            {
                body.extend(report);
            }
            Ok(Json(body).into_response())
        }
    }
}

fn redirect_response(mode: ResponseMode, session: CheckoutSession) -> Response {
    match mode {
        ResponseMode::Json => Json(CheckoutResponse {
            ok: true,
            url: session.url,
            id: session.id,
        })
        .into_response(),
        ResponseMode::Redirect => {
            (StatusCode::FOUND, [(header::LOCATION, session.url)]).into_response()
        }
    }
}
