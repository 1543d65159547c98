//! Sampling and cost policy

use crate::mapper::{CACHE_READ_TOKENS, CACHE_WRITE_TOKENS};
use crate::types::GenerationObservation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Probabilistic gate deciding whether an observation is forwarded
///
/// The generator is seeded once, at construction.
#[derive(Debug)]
pub struct Sampler {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl Sampler {
    /// Sampler seeded from the current time
    pub fn new(rate: f64) -> Self {
        // low 64 bits of the nanosecond clock
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seed = (nanos & u128::from(u64::MAX)) as u64;
        Self::with_seed(rate, seed)
    }

    /// Deterministic sampler, for tests
    pub fn with_seed(rate: f64, seed: u64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// `rate >= 1` always samples, `rate <= 0` never does; otherwise draw
    /// from `[0, 1)` and sample when the draw is below the rate.
    pub fn should_sample(&self) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        let draw: f64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen();
        draw < self.rate
    }
}

/// Attribute key with a precomputed cost
pub const COST: &str = "cost";
pub const INPUT_PRICE_PER_1M: &str = "input_price_per_1m";
pub const OUTPUT_PRICE_PER_1M: &str = "output_price_per_1m";
pub const CACHE_READ_PRICE_PER_1M: &str = "cache_read_price_per_1m";
pub const CACHE_WRITE_PRICE_PER_1M: &str = "cache_write_price_per_1m";

fn per_million(tokens: i64, price: f64) -> f64 {
    (tokens as f64 / 1_000_000.0) * price
}

/// Best-effort cost of a generation from its attributes
///
/// A float `cost` attribute wins. Otherwise both per-1M prices must be
/// present (as floats); cache tokens are priced only when both the token
/// count (integer) and its price are given. Missing pricing yields 0.
pub fn calculate_cost(obs: &GenerationObservation) -> f64 {
    let attrs = &obs.attributes;

    if let Some(cost) = attrs.get_f64(COST) {
        return cost;
    }

    let (Some(input_price), Some(output_price)) = (
        attrs.get_f64(INPUT_PRICE_PER_1M),
        attrs.get_f64(OUTPUT_PRICE_PER_1M),
    ) else {
        return 0.0;
    };

    let mut cost = per_million(obs.prompt_tokens, input_price)
        + per_million(obs.completion_tokens, output_price);

    let cached = [
        (CACHE_WRITE_TOKENS, CACHE_WRITE_PRICE_PER_1M),
        (CACHE_READ_TOKENS, CACHE_READ_PRICE_PER_1M),
    ];
    for (tokens_key, price_key) in cached {
        if let (Some(tokens), Some(price)) = (attrs.get_i64(tokens_key), attrs.get_f64(price_key)) {
            if tokens > 0 {
                cost += per_million(tokens, price);
            }
        }
    }

    cost
}
