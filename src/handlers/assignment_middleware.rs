use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::{header, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::variant_models::{Assignment, AssignmentSource, Variant};
use crate::utils::cookie_utils::read_cookies;
use crate::utils::utm_utils::query_param;
use crate::utils::variant_selector::{
    generate_random, normalize_variant, pick_variant, RandomSourceError, SelectorError,
};
use crate::AppState;

pub const NO_STORE: &str = "no-store, private";

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    RandomSource(#[from] RandomSourceError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error("failed to rewrite request: {0}")]
    Rewrite(String),
}

impl IntoResponse for AssignmentError {
    fn into_response(self) -> Response {
        error!(error = %self, "variant assignment failed");
        sentry::capture_error(&self);

        let body = Json(json!({
            "error": "Internal server error",
        }));
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        response
    }
}

/// Runs in front of routing. Root requests get a variant (override, then
/// cookie, then a fresh draw), are rewritten to `/{variant}` and get the
/// assignment cookie back. Everything else is passed through untouched.
pub async fn assign_variant(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AssignmentError> {
    if request.uri().path() != "/" {
        return Ok(next.run(request).await);
    }

    let assignment = resolve_assignment(&state, &request)?;
    info!(
        variant = %assignment.variant,
        source = assignment.source.as_str(),
        "assigned landing variant"
    );

    let rewritten = variant_uri(request.uri(), &assignment.variant)?;
    *request.uri_mut() = rewritten;
    let set_cookie = HeaderValue::from_str(&state.cookie.set_cookie(&assignment.variant))
        .map_err(|e| AssignmentError::Rewrite(e.to_string()))?;
    request.extensions_mut().insert(assignment);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.append(header::SET_COOKIE, set_cookie);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    Ok(response)
}

fn resolve_assignment(state: &AppState, request: &Request) -> Result<Assignment, AssignmentError> {
    let override_raw = request
        .uri()
        .query()
        .and_then(|query| query_param(query, &state.override_param));
    if let Some(variant) = normalize_variant(override_raw.as_deref(), &state.variants) {
        return Ok(Assignment::new(variant, AssignmentSource::Override));
    }
    if let Some(raw) = &override_raw {
        debug!(value = %raw, "ignoring invalid variant override");
    }

    // first valid value wins, a stale duplicate must not force a redraw
    let cookie_values: Vec<&str> = read_cookies(request.headers(), &state.cookie.name).collect();
    let from_cookie = cookie_values
        .iter()
        .copied()
        .find_map(|raw| normalize_variant(Some(raw), &state.variants));
    if let Some(variant) = from_cookie {
        return Ok(Assignment::new(variant, AssignmentSource::Cookie));
    }
    if !cookie_values.is_empty() {
        debug!(values = ?cookie_values, "ignoring invalid variant cookie");
    }

    let sample = generate_random(state.random.as_ref())?;
    let variant = pick_variant(sample, &state.split)?;
    Ok(Assignment::new(variant, AssignmentSource::Fresh))
}

// keeps scheme, authority and query, swaps the path
fn variant_uri(uri: &Uri, variant: &Variant) -> Result<Uri, AssignmentError> {
    let path = match uri.query() {
        Some(query) => format!("/{}?{}", variant, query),
        None => format!("/{}", variant),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path.parse::<PathAndQuery>()
            .map_err(|e| AssignmentError::Rewrite(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| AssignmentError::Rewrite(e.to_string()))
}
