use url::{form_urlencoded, Url};

// campaign params carried from the ad click onto checkout links.
// utm_source is owned by the checkout url itself
pub const AD_UTM_KEYS: [&str; 4] = ["utm_campaign", "utm_medium", "utm_content", "utm_term"];

const UTM_SOURCE: &str = "utm_source";
const ORGANIC_SOURCE: &str = "organic";

/// First value of `key` in a raw query string, percent-decoded.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn ad_utm_params(query: &str) -> Vec<(String, String)> {
    AD_UTM_KEYS
        .iter()
        .filter_map(|key| {
            query_param(query, key)
                .filter(|value| !value.is_empty())
                .map(|value| (key.to_string(), value))
        })
        .collect()
}

/// Appends `suffix` to utm_source unless it is already there. Links without a
/// source get `organic{suffix}`.
pub fn tag_utm_source(url: &mut Url, suffix: &str) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(k, _)| k == UTM_SOURCE) {
        Some((_, source)) => {
            if source.ends_with(suffix) {
                return;
            }
            source.push_str(suffix);
        }
        None => pairs.push((UTM_SOURCE.to_string(), format!("{}{}", ORGANIC_SOURCE, suffix))),
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

pub fn checkout_link(base: &Url, suffix: Option<&str>, ad_params: &[(String, String)]) -> Url {
    let mut link = base.clone();
    if let Some(suffix) = suffix {
        tag_utm_source(&mut link, suffix);
    }
    if !ad_params.is_empty() {
        link.query_pairs_mut().extend_pairs(ad_params);
    }
    link
}
