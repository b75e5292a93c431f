use std::path::Path;
use std::sync::Arc;
use axum::{
    http::Method,
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers::assignment_middleware::assign_variant;
use crate::handlers::checkout_handlers;
use crate::handlers::variant_handlers;
use crate::models::variant_models::VariantSet;
use crate::AppState;

/// One static directory per variant, `/{label}` -> `{pages_dir}/{label}`.
pub fn variant_pages(pages_dir: &Path, variants: &VariantSet) -> Router {
    variants.iter().fold(Router::new(), |router, variant| {
        let dir = pages_dir.join(variant.as_str());
        router.nest_service(&format!("/{}", variant), ServeDir::new(dir))
    })
}

/// The assignment middleware sits on an outer router whose fallback is the
/// real application, so root requests are rewritten before they are routed.
pub fn app(state: Arc<AppState>, pages: Router) -> Router {
    let api = Router::new()
        .route("/api/health", get(variant_handlers::health_check))
        .route("/api/variants", get(variant_handlers::list_variants))
        .route("/api/checkout", get(checkout_handlers::checkout_redirect))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_origin(Any),
        )
        .with_state(state.clone());

    let inner = api.merge(pages);

    Router::new()
        .fallback_service(inner)
        .layer(middleware::from_fn_with_state(state, assign_variant))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::split_config::SplitConfig;
    use crate::utils::cookie_utils::CookieSettings;
    use crate::utils::variant_selector::MockRandomSource;

    const PAGE_C: &str = "<html>PAGE C</html>";

    fn pages_app(pages_dir: &Path) -> Router {
        let variants = VariantSet::new(["c", "d"]).unwrap();
        let split = SplitConfig::parse("c", &variants).unwrap();
        let mut random = MockRandomSource::new();
        random.expect_next_u32().returning(|| Ok(0));
        let pages = variant_pages(pages_dir, &variants);
        let state = Arc::new(AppState {
            variants,
            split,
            cookie: CookieSettings::default(),
            override_param: "ab".to_string(),
            checkout_url: None,
            random: Arc::new(random),
        });
        app(state, pages)
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_and_direct_visits_serve_variant_index() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("c")).unwrap();
        fs::write(tmp.path().join("c").join("index.html"), PAGE_C).unwrap();
        let app = pages_app(tmp.path());

        for uri in ["/", "/?utm_campaign=x", "/c", "/c/"] {
            let (status, body) = fetch(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert_eq!(body, PAGE_C, "{}", uri);
        }
    }

    #[tokio::test]
    async fn missing_variant_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let (status, _) = fetch(pages_app(tmp.path()), "/d").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
