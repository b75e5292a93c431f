use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::config::split_config::SplitConfig;
use crate::models::variant_models::{Variant, VariantSet};

// 2^32, so a u32 draw lands in [0, 1)
const SAMPLE_SCALE: f64 = 4_294_967_296.0;

#[derive(Debug, Error)]
#[error("secure random source unavailable: {0}")]
pub struct RandomSourceError(pub String);

#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("sample {0} is outside [0, 1)")]
    SampleOutOfRange(f64),
}

/// Source of uniformly distributed 32-bit values. Production uses the OS
/// entropy pool; tests swap in a mock.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send + Sync {
    fn next_u32(&self) -> Result<u32, RandomSourceError>;
}

pub struct OsRandom;

impl RandomSource for OsRandom {
    fn next_u32(&self) -> Result<u32, RandomSourceError> {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| RandomSourceError(e.to_string()))?;
        Ok(u32::from_le_bytes(bytes))
    }
}

pub fn generate_random(source: &dyn RandomSource) -> Result<f64, RandomSourceError> {
    let raw = source.next_u32()?;
    Ok(f64::from(raw) / SAMPLE_SCALE)
}

/// Maps a sample in [0, 1) to the first bucket whose upper bound is above it.
/// Samples outside the range (NaN included) are a caller bug.
pub fn pick_variant(sample: f64, split: &SplitConfig) -> Result<Variant, SelectorError> {
    if !(0.0..1.0).contains(&sample) {
        return Err(SelectorError::SampleOutOfRange(sample));
    }

    split
        .buckets()
        .iter()
        .find(|bucket| sample < bucket.upper)
        .map(|bucket| bucket.variant.clone())
        .ok_or(SelectorError::SampleOutOfRange(sample))
}

/// Validates an untrusted variant string (query parameter or cookie).
/// Absent and unknown values both come back as `None`.
pub fn normalize_variant(value: Option<&str>, variants: &VariantSet) -> Option<Variant> {
    value.and_then(|raw| variants.normalize(raw))
}
