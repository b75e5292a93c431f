use std::time::Duration;
use axum::http::{header, HeaderMap};

use crate::models::variant_models::Variant;

pub const DEFAULT_COOKIE_NAME: &str = "lp_variant";
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        CookieSettings {
            name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl CookieSettings {
    pub fn set_cookie(&self, variant: &Variant) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; SameSite=Lax",
            self.name,
            variant,
            self.max_age.as_secs()
        )
    }
}

pub fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Every value of the cookie called `name`, in header order. Browsers can
/// send duplicates when a stale cookie with another path or domain is left.
pub fn read_cookies<'a>(
    headers: &'a HeaderMap,
    name: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(move |(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}
