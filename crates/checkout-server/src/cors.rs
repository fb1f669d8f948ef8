//! Cross-Origin Headers
//!
//! Applied to every response. Preflight requests are answered here with
//! `204` and never reach the checkout handler.
//!
//! `tower_http::cors::CorsLayer` is not used: it only sets allow-methods and
//! allow-headers on preflight responses and answers preflight with `200`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use checkout_payments::AllowOrigins;

use crate::state::AppState;

const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// CORS middleware
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();

    let mut response = if *request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    apply(&state, origin.as_ref(), response.headers_mut());
    response
}

fn apply(state: &AppState, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
    let config = state.config();

    match &config.allow_origins {
        AllowOrigins::Any => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        AllowOrigins::List(allowed) => {
            let listed = origin.filter(|o| {
                o.to_str()
                    .map(|o| allowed.iter().any(|a| a == o.trim_end_matches('/')))
                    .unwrap_or(false)
            });
            if let Some(origin) = listed {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            }
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    let methods = format!("{}, OPTIONS", config.method.as_str());
    if let Ok(methods) = HeaderValue::from_str(&methods) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}
