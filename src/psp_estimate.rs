// Copyright 2018 Chris Pearce
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pattern spectrum estimation without mining.
//!
//! For every item set size the expected support of randomly sampled item
//! sets is computed under item independence, given the item frequencies and
//! the transaction size distribution. The support of a set is modelled as
//! Poisson (or, with dispersion, negative binomial) around that expectation,
//! and the averaged distribution is scaled by the number of item sets of the
//! size.

use crate::error::{MineError, MineResult};
use crate::item::Support;
use crate::pattern_spectrum::PatternSpectrum;
use crate::tabag::{SortOrder, Threshold, TransactionBag};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::info;

// Probabilities below e^-30 past the mean end a distribution.
const LN_NEGLIGIBLE: f64 = -30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct EstimateConfig {
    pub support: Threshold,
    pub min_size: usize,
    pub max_size: usize,
    // Equivalent number of surrogate data sets; counts are stored
    // multiplied by it.
    pub equiv: usize,
    // Dispersion of the support distribution; 0 gives Poisson.
    pub alpha: f64,
    // Sampled item sets per size.
    pub samples: usize,
    // 0 seeds from the clock.
    pub seed: u64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        EstimateConfig {
            support: Threshold::Absolute(2),
            min_size: 2,
            max_size: usize::MAX,
            equiv: 10000,
            alpha: 0.5,
            samples: 1000,
            seed: 0,
        }
    }
}

impl EstimateConfig {
    pub fn validate(&self) -> MineResult<()> {
        if self.samples == 0 {
            return Err(MineError::invalid("number of samples must be positive"));
        }
        if !(self.alpha >= 0.0) || !self.alpha.is_finite() {
            return Err(MineError::invalid(format!(
                "dispersion {} must not be negative",
                self.alpha
            )));
        }
        if self.equiv == 0 {
            return Err(MineError::invalid("equivalent data set count must be positive"));
        }
        if !self.support.is_valid() {
            return Err(MineError::invalid("support threshold must not be negative"));
        }
        if self.min_size > self.max_size {
            return Err(MineError::invalid(format!(
                "minimum size {} exceeds maximum size {}",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

// Natural logarithm of the binomial coefficient n over k.
fn ln_binomial(n: usize, k: usize) -> f64 {
    (1..=k)
        .map(|i| ((n - k + i) as f64).ln() - (i as f64).ln())
        .sum()
}

// Adds the probabilities of the supports min_support..=max_support of a
// count distribution with the given mean into bins[support - min_support].
fn add_distribution(
    mean: f64,
    alpha: f64,
    min_support: Support,
    max_support: Support,
    bins: &mut [f64],
) {
    if mean <= 0.0 {
        return;
    }
    // ln P(0) and the log ratio P(s)/P(s-1) as a function of s.
    let (mut ln_p, r, ln_q) = if alpha > 0.0 {
        let r = 1.0 / alpha;
        let p = r / (r + mean);
        (r * p.ln(), r, (1.0 - p).ln())
    } else {
        (-mean, 0.0, mean.ln())
    };
    for s in 0..=max_support {
        if s > 0 {
            let s = s as f64;
            ln_p += if alpha > 0.0 {
                (s - 1.0 + r).ln() - s.ln() + ln_q
            } else {
                ln_q - s.ln()
            };
        }
        if s >= min_support {
            bins[(s - min_support) as usize] += ln_p.exp();
        }
        if s as f64 > mean && ln_p < LN_NEGLIGIBLE {
            break;
        }
    }
}

// Estimates the pattern spectrum of bag. Counts are the expected numbers of
// item sets per size and support, multiplied by config.equiv.
pub fn estimate_spectrum(
    bag: &TransactionBag,
    config: &EstimateConfig,
) -> MineResult<PatternSpectrum> {
    config.validate()?;
    let timer = Instant::now();
    let total_weight = bag.total_weight();
    let min_support = config.support.min_count(total_weight);
    let max_support = total_weight.max(min_support);
    let mut spectrum = PatternSpectrum::new(
        config.min_size.max(1),
        config.max_size.max(1),
        min_support,
        max_support,
    )?;

    let mut source = bag.clone();
    let item_count = source.recode(min_support, SortOrder::Decreasing);
    if item_count == 0 {
        return Ok(spectrum);
    }
    let frequencies: Vec<f64> = source
        .item_frequencies()
        .as_slice()
        .iter()
        .map(|&f| f as f64)
        .collect();
    let instances = source.extent() as f64;
    let largest = source.max_size();
    let mut size_weights: Vec<f64> = Vec::new();
    size_weights.try_reserve(largest + 1)?;
    size_weights.resize(largest + 1, 0.0);
    for t in source.transactions() {
        size_weights[t.len()] += t.weight as f64;
    }

    let mut bins: Vec<f64> = Vec::new();
    bins.try_reserve((max_support - min_support) as usize + 1)?;
    bins.resize((max_support - min_support) as usize + 1, 0.0);

    let seed = match config.seed {
        0 => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(1),
        seed => seed,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let max_size = config.max_size.min(item_count).min(largest);
    for size in config.min_size.max(1)..=max_size {
        for bin in bins.iter_mut() {
            *bin = 0.0;
        }
        for _ in 0..config.samples {
            let items = index::sample(&mut rng, item_count, size);
            let mut mean = 0.0;
            for (k, &weight) in size_weights.iter().enumerate().skip(size) {
                if weight <= 0.0 {
                    continue;
                }
                let k = k as f64;
                let p: f64 = items
                    .iter()
                    .map(|i| (k * frequencies[i] / instances).min(1.0))
                    .product();
                mean += weight * p;
            }
            add_distribution(mean, config.alpha, min_support, max_support, &mut bins);
        }

        let scale = ln_binomial(item_count, size).exp() * config.equiv as f64
            / config.samples as f64;
        for (offset, &p) in bins.iter().enumerate() {
            let count = (p * scale).round();
            if count >= 1.0 {
                spectrum.add_count(size, min_support + offset as Support, count as u64)?;
            }
        }
    }
    info!(
        "Estimated {} signatures in {} seconds.",
        spectrum.signature_count(),
        timer.elapsed().as_secs()
    );
    Ok(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_bag() -> TransactionBag {
        let row: &[&str] = &["a", "b"];
        TransactionBag::from_names(&vec![row; 10])
    }

    #[test]
    fn test_ln_binomial() {
        assert!((ln_binomial(5, 2).exp() - 10.0).abs() < 1e-9);
        assert!((ln_binomial(7, 0).exp() - 1.0).abs() < 1e-12);
        assert!((ln_binomial(4, 4).exp() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_poisson() {
        let config = EstimateConfig {
            min_size: 1,
            alpha: 0.0,
            equiv: 1000,
            samples: 5,
            seed: 1,
            ..EstimateConfig::default()
        };
        let spectrum = estimate_spectrum(&pair_bag(), &config).unwrap();
        // Every item and the pair have an expected support of 10; the
        // Poisson probability of exactly 10 is 0.1251.
        assert_eq!(spectrum.count(1, 10), 250);
        assert_eq!(spectrum.count(2, 10), 125);
        assert_eq!(spectrum.count(3, 10), 0);
        let pairs: u64 = spectrum
            .iter()
            .filter(|&(size, _, _)| size == 2)
            .map(|(_, _, count)| count)
            .sum();
        // Supports are capped at the total weight of 10.
        assert!(pairs > 575 && pairs < 590, "{}", pairs);
    }

    #[test]
    fn test_dispersion_widens_distribution() {
        let config = EstimateConfig {
            alpha: 0.5,
            equiv: 1000,
            samples: 5,
            seed: 1,
            ..EstimateConfig::default()
        };
        let spectrum = estimate_spectrum(&pair_bag(), &config).unwrap();
        assert!(spectrum.count(2, 10) < 125);
        // Poisson gives 8 here, the negative binomial 64.
        assert!(spectrum.count(2, 3) > 20);
        assert_eq!(spectrum.count(1, 10), 0);
    }

    #[test]
    fn test_same_seed_same_estimate() {
        let bag = TransactionBag::from_names(&[
            &["a", "b", "c"],
            &["a", "d"],
            &["b", "c", "e"],
            &["a", "b", "e"],
            &["c", "d", "e"],
        ]);
        let config = EstimateConfig {
            seed: 17,
            samples: 50,
            ..EstimateConfig::default()
        };
        let a = estimate_spectrum(&bag, &config).unwrap();
        let b = estimate_spectrum(&bag, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        for config in &[
            EstimateConfig {
                samples: 0,
                ..EstimateConfig::default()
            },
            EstimateConfig {
                alpha: -0.1,
                ..EstimateConfig::default()
            },
        ] {
            assert!(matches!(
                estimate_spectrum(&pair_bag(), config),
                Err(MineError::InvalidConfiguration(_))
            ));
        }
    }
}
