use std::sync::Arc;
use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::variant_models::Variant;
use crate::AppState;

#[derive(Serialize)]
pub struct SplitShare {
    pub variant: Variant,
    pub share: f64,
}

#[derive(Serialize)]
pub struct VariantsResponse {
    pub variants: Vec<Variant>,
    pub split: Vec<SplitShare>,
    pub cookie_name: String,
    pub cookie_max_age: u64,
    pub override_param: String,
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_variants(State(state): State<Arc<AppState>>) -> Json<VariantsResponse> {
    Json(VariantsResponse {
        variants: state.variants.iter().cloned().collect(),
        split: state
            .split
            .shares()
            .iter()
            .map(|(variant, share)| SplitShare {
                variant: variant.clone(),
                share: *share,
            })
            .collect(),
        cookie_name: state.cookie.name.clone(),
        cookie_max_age: state.cookie.max_age.as_secs(),
        override_param: state.override_param.clone(),
    })
}
