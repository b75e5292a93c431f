use std::sync::Arc;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::handlers::assignment_middleware::NO_STORE;
use crate::models::variant_models::Variant;
use crate::utils::cookie_utils::read_cookies;
use crate::utils::utm_utils::{ad_utm_params, checkout_link, query_param};
use crate::utils::variant_selector::normalize_variant;
use crate::AppState;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Checkout is not configured")]
    NotConfigured,
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = match self {
            CheckoutError::NotConfigured => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Sends the visitor on to checkout with the variant tagged on utm_source
/// and the ad campaign params carried over.
pub async fn checkout_redirect(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, CheckoutError> {
    let base = state.checkout_url.as_ref().ok_or_else(|| {
        warn!("checkout requested but CHECKOUT_URL is not set");
        CheckoutError::NotConfigured
    })?;

    let query = uri.query().unwrap_or("");
    let variant = normalize_variant(query_param(query, "variant").as_deref(), &state.variants)
        .or_else(|| {
            read_cookies(&headers, &state.cookie.name)
                .find_map(|raw| normalize_variant(Some(raw), &state.variants))
        });
    let suffix = variant.as_ref().map(Variant::suffix);

    let link = checkout_link(base, suffix.as_deref(), &ad_utm_params(query));
    debug!(variant = ?variant.as_ref().map(Variant::as_str), "redirecting to checkout");

    let mut response = Redirect::to(link.as_str()).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    Ok(response)
}
