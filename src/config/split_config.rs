use thiserror::Error;

use crate::models::variant_models::{Variant, VariantSet};

#[derive(Debug, Error)]
pub enum SplitConfigError {
    #[error("variant set is empty")]
    EmptyVariantSet,
    #[error("invalid variant label '{0}'")]
    InvalidLabel(String),
    #[error("variant '{0}' is listed more than once")]
    DuplicateLabel(String),
    #[error("split references '{0}' which is not in the variant set")]
    UnknownVariant(String),
    #[error("split is empty")]
    EmptySplit,
    #[error("malformed split entry '{0}', expected label:weight")]
    MalformedEntry(String),
    #[error("invalid weight '{weight}' for variant '{label}'")]
    InvalidWeight { label: String, weight: String },
    #[error("split weights add up to zero")]
    ZeroTotalWeight,
    #[error("split bounds are not strictly increasing at variant '{0}'")]
    BoundsNotIncreasing(String),
}

/// A variant together with the exclusive upper end of its slice of [0, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub variant: Variant,
    pub upper: f64,
}

/// Partition of [0, 1) across variants. Buckets are ordered, their upper
/// bounds strictly increase and the last one is exactly 1.0. Variants with a
/// zero weight keep their share entry but get no bucket.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    buckets: Vec<Bucket>,
    shares: Vec<(Variant, f64)>,
}

impl SplitConfig {
    pub fn builder(variants: &VariantSet) -> SplitConfigBuilder<'_> {
        SplitConfigBuilder {
            variants,
            weights: Vec::new(),
        }
    }

    /// Parses `label:weight` entries separated by commas, e.g. `c:50,d:50`.
    /// A bare label counts as weight 1.
    pub fn parse(raw: &str, variants: &VariantSet) -> Result<Self, SplitConfigError> {
        let mut builder = SplitConfig::builder(variants);
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (label, weight) = match entry.split_once(':') {
                Some((label, weight)) => {
                    let label = label.trim();
                    if label.is_empty() {
                        return Err(SplitConfigError::MalformedEntry(entry.to_string()));
                    }
                    let parsed = weight.trim().parse::<f64>().map_err(|_| {
                        SplitConfigError::InvalidWeight {
                            label: label.to_string(),
                            weight: weight.trim().to_string(),
                        }
                    })?;
                    (label, parsed)
                }
                None => (entry, 1.0),
            };
            builder = builder.weight(label, weight);
        }
        builder.build()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Every configured split entry with its fraction of traffic.
    pub fn shares(&self) -> &[(Variant, f64)] {
        &self.shares
    }
}

pub struct SplitConfigBuilder<'a> {
    variants: &'a VariantSet,
    weights: Vec<(String, f64)>,
}

impl<'a> SplitConfigBuilder<'a> {
    pub fn weight(mut self, label: &str, weight: f64) -> Self {
        self.weights.push((label.to_string(), weight));
        self
    }

    pub fn build(self) -> Result<SplitConfig, SplitConfigError> {
        if self.weights.is_empty() {
            return Err(SplitConfigError::EmptySplit);
        }

        let mut entries: Vec<(Variant, f64)> = Vec::with_capacity(self.weights.len());
        for (label, weight) in &self.weights {
            let variant = self
                .variants
                .normalize(label)
                .ok_or_else(|| SplitConfigError::UnknownVariant(label.clone()))?;
            if entries.iter().any(|(v, _)| *v == variant) {
                return Err(SplitConfigError::DuplicateLabel(variant.to_string()));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(SplitConfigError::InvalidWeight {
                    label: label.clone(),
                    weight: weight.to_string(),
                });
            }
            entries.push((variant, *weight));
        }

        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(SplitConfigError::ZeroTotalWeight);
        }

        let shares: Vec<(Variant, f64)> = entries
            .iter()
            .map(|(v, w)| (v.clone(), w / total))
            .collect();

        let last_drawn = shares
            .iter()
            .rposition(|(_, share)| *share > 0.0)
            .ok_or(SplitConfigError::ZeroTotalWeight)?;

        let mut buckets: Vec<Bucket> = Vec::new();
        let mut cumulative: f64 = 0.0;
        for (idx, (variant, share)) in shares.iter().enumerate() {
            if *share <= 0.0 {
                continue;
            }
            cumulative += share;
            // pin the final bound, float sums rarely land on 1.0 exactly
            let upper = if idx == last_drawn { 1.0 } else { cumulative };
            let increasing = buckets.last().map_or(upper > 0.0, |prev| upper > prev.upper);
            if !increasing || upper > 1.0 || (idx != last_drawn && upper >= 1.0) {
                return Err(SplitConfigError::BoundsNotIncreasing(variant.to_string()));
            }
            buckets.push(Bucket {
                variant: variant.clone(),
                upper,
            });
        }

        Ok(SplitConfig { buckets, shares })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants() -> VariantSet {
        VariantSet::new(["a", "b", "c", "d"]).unwrap()
    }

    fn bounds(split: &SplitConfig) -> Vec<(&str, f64)> {
        split
            .buckets()
            .iter()
            .map(|b| (b.variant.as_str(), b.upper))
            .collect()
    }

    #[test]
    fn even_two_way_split() {
        let split = SplitConfig::parse("c:50,d:50", &variants()).unwrap();
        assert_eq!(bounds(&split), vec![("c", 0.5), ("d", 1.0)]);
    }

    #[test]
    fn uneven_four_way_split_ends_at_one() {
        let split = SplitConfig::builder(&variants())
            .weight("a", 0.1)
            .weight("b", 0.2)
            .weight("c", 0.3)
            .weight("d", 0.4)
            .build()
            .unwrap();
        let b = bounds(&split);
        assert_eq!(b.len(), 4);
        assert_eq!(b[3], ("d", 1.0));
        assert!(b.windows(2).all(|w| w[0].1 < w[1].1));
    }

    #[test]
    fn zero_weight_entries_get_no_bucket() {
        let split = SplitConfig::parse("c:0, d:100", &variants()).unwrap();
        assert_eq!(bounds(&split), vec![("d", 1.0)]);
        assert_eq!(split.shares().len(), 2);
        assert_eq!(split.shares()[0].1, 0.0);
    }

    #[test]
    fn single_bare_label_is_a_full_split() {
        let split = SplitConfig::parse("D", &variants()).unwrap();
        assert_eq!(bounds(&split), vec![("d", 1.0)]);
    }

    #[test]
    fn rejects_invalid_splits() {
        let set = variants();
        assert!(matches!(SplitConfig::parse("", &set), Err(SplitConfigError::EmptySplit)));
        assert!(matches!(
            SplitConfig::parse("z:1", &set),
            Err(SplitConfigError::UnknownVariant(_))
        ));
        assert!(matches!(
            SplitConfig::parse("a:1,A:1", &set),
            Err(SplitConfigError::DuplicateLabel(_))
        ));
        assert!(matches!(
            SplitConfig::parse("a:-1,b:2", &set),
            Err(SplitConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            SplitConfig::parse("a:half", &set),
            Err(SplitConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            SplitConfig::parse(":5", &set),
            Err(SplitConfigError::MalformedEntry(_))
        ));
        assert!(matches!(
            SplitConfig::parse("a:0,b:0", &set),
            Err(SplitConfigError::ZeroTotalWeight)
        ));
        assert!(matches!(
            SplitConfig::builder(&set).weight("a", f64::NAN).build(),
            Err(SplitConfigError::InvalidWeight { .. })
        ));
    }
}
