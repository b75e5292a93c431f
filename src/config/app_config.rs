use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{anyhow, bail, Context};
use url::Url;

use crate::config::split_config::SplitConfig;
use crate::models::variant_models::VariantSet;
use crate::utils::cookie_utils::{is_valid_cookie_name, CookieSettings, DEFAULT_COOKIE_NAME};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_VARIANTS: &str = "a,b,c,d";
const DEFAULT_SPLIT: &str = "c:50,d:50";
const DEFAULT_COOKIE_MAX_AGE_DAYS: u64 = 30;
const DEFAULT_OVERRIDE_PARAM: &str = "ab";
const DEFAULT_PAGES_DIR: &str = "pages";

pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub variants: VariantSet,
    pub split: SplitConfig,
    pub cookie: CookieSettings,
    pub override_param: String,
    pub pages_dir: PathBuf,
    pub checkout_url: Option<Url>,
    pub sentry_dsn: Option<sentry::types::Dsn>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr = var("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("LISTEN_ADDR must be a socket address like 127.0.0.1:3000")?;

        let variants_raw = var("AB_VARIANTS").unwrap_or_else(|| DEFAULT_VARIANTS.to_string());
        let variants = VariantSet::new(variants_raw.split(',').map(str::trim))
            .context("invalid AB_VARIANTS")?;

        let split_raw = var("AB_SPLIT").unwrap_or_else(|| DEFAULT_SPLIT.to_string());
        let split = SplitConfig::parse(&split_raw, &variants).context("invalid AB_SPLIT")?;

        let cookie_name = var("AB_COOKIE_NAME").unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
        if !is_valid_cookie_name(&cookie_name) {
            bail!("AB_COOKIE_NAME '{}' is not a valid cookie name", cookie_name);
        }

        let max_age_days = match var("AB_COOKIE_MAX_AGE_DAYS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("AB_COOKIE_MAX_AGE_DAYS must be a whole number of days")?,
            None => DEFAULT_COOKIE_MAX_AGE_DAYS,
        };
        if max_age_days == 0 {
            bail!("AB_COOKIE_MAX_AGE_DAYS must be at least 1");
        }
        let max_age = max_age_days
            .checked_mul(24 * 60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow!("AB_COOKIE_MAX_AGE_DAYS is too large"))?;

        let override_param =
            var("AB_OVERRIDE_PARAM").unwrap_or_else(|| DEFAULT_OVERRIDE_PARAM.to_string());

        let pages_dir =
            PathBuf::from(var("PAGES_DIR").unwrap_or_else(|| DEFAULT_PAGES_DIR.to_string()));

        let checkout_url = var("CHECKOUT_URL")
            .map(|raw| Url::parse(&raw))
            .transpose()
            .context("CHECKOUT_URL must be an absolute url")?;

        let sentry_dsn = var("SENTRY_DSN")
            .map(|raw| raw.parse::<sentry::types::Dsn>())
            .transpose()
            .context("invalid SENTRY_DSN")?;

        Ok(AppConfig {
            listen_addr,
            variants,
            split,
            cookie: CookieSettings {
                name: cookie_name,
                max_age,
            },
            override_param,
            pages_dir,
            checkout_url,
            sentry_dsn,
        })
    }
}
