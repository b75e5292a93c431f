use std::sync::Arc;
use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

mod config {
    pub mod app_config;
    pub mod split_config;
}
mod handlers {
    pub mod assignment_middleware;
    pub mod checkout_handlers;
    pub mod variant_handlers;
}
mod models {
    pub mod variant_models;
}
mod utils {
    pub mod cookie_utils;
    pub mod utm_utils;
    pub mod variant_selector;
}
mod routes;

use config::app_config::AppConfig;
use config::split_config::SplitConfig;
use models::variant_models::VariantSet;
use utils::cookie_utils::CookieSettings;
use utils::variant_selector::{OsRandom, RandomSource};

// read-only after startup, shared by every request
pub struct AppState {
    variants: VariantSet,
    split: SplitConfig,
    cookie: CookieSettings,
    override_param: String,
    checkout_url: Option<Url>,
    random: Arc<dyn RandomSource>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let _guard = config.sentry_dsn.clone().map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            ..Default::default()
        })
    });

    info!(variants = config.variants.len(), "loaded variant set");
    for (variant, share) in config.split.shares() {
        info!(variant = %variant, share = *share, "split entry");
    }

    let pages = routes::variant_pages(&config.pages_dir, &config.variants);
    let state = Arc::new(AppState {
        variants: config.variants,
        split: config.split,
        cookie: config.cookie,
        override_param: config.override_param,
        checkout_url: config.checkout_url,
        random: Arc::new(OsRandom),
    });
    let app = routes::app(state, pages);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "landing router listening");

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
