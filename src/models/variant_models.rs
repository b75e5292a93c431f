use std::fmt;
use serde::Serialize;

use crate::config::split_config::SplitConfigError;

const MAX_LABEL_LEN: usize = 32;

/// One label out of the closed variant set, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    // used as the utm_source suffix on checkout links, "c" -> "C"
    pub fn suffix(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of variants known at configuration time. Anything outside
/// of it is invalid, whatever the split currently draws.
#[derive(Debug, Clone)]
pub struct VariantSet {
    variants: Vec<Variant>,
}

impl VariantSet {
    pub fn new<I, S>(labels: I) -> Result<Self, SplitConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut variants: Vec<Variant> = Vec::new();
        for raw in labels {
            let label = raw.as_ref().trim().to_lowercase();
            if !is_valid_label(&label) {
                return Err(SplitConfigError::InvalidLabel(raw.as_ref().to_string()));
            }
            if variants.iter().any(|v| v.0 == label) {
                return Err(SplitConfigError::DuplicateLabel(label));
            }
            variants.push(Variant(label));
        }

        if variants.is_empty() {
            return Err(SplitConfigError::EmptyVariantSet);
        }

        Ok(VariantSet { variants })
    }

    /// Trims and lowercases `raw` and looks it up in the set.
    pub fn normalize(&self, raw: &str) -> Option<Variant> {
        let candidate = raw.trim().to_lowercase();
        self.variants.iter().find(|v| v.0 == candidate).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }
}

// labels double as path segments, so keep them to a safe alphabet
fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    Override,
    Cookie,
    Fresh,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentSource::Override => "override",
            AssignmentSource::Cookie => "cookie",
            AssignmentSource::Fresh => "fresh",
        }
    }
}

/// The resolved variant for a root request. Inserted into the request
/// extensions so page handlers can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variant: Variant,
    pub source: AssignmentSource,
}

impl Assignment {
    pub fn new(variant: Variant, source: AssignmentSource) -> Self {
        Assignment { variant, source }
    }
}
