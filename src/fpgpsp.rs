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

//! Pattern spectrum generation by mining many surrogate data sets.

use crate::cancel::CancelToken;
use crate::error::{MineError, MineResult};
use crate::fptree::mine_fp_growth;
use crate::isect_tree::{ReportMode, TreeVariant};
use crate::ista::{Ista, IstaConfig};
use crate::item::Support;
use crate::pattern_spectrum::PatternSpectrum;
use crate::report::{Reporter, Target};
use crate::surrogate::Surrogate;
use crate::tabag::{SortOrder, Threshold, TransactionBag};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Algorithm {
    FpGrowth,
    Ista(TreeVariant),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumConfig {
    pub target: Target,
    pub support: Threshold,
    pub min_size: usize,
    pub max_size: usize,
    pub algorithm: Algorithm,
    pub surrogate: Surrogate,
    pub count: usize,
    // 0 seeds from the clock.
    pub seed: u64,
    // 0 or less uses all available processors.
    pub workers: i32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        SpectrumConfig {
            target: Target::Closed,
            support: Threshold::Absolute(2),
            min_size: 2,
            max_size: usize::MAX,
            algorithm: Algorithm::FpGrowth,
            surrogate: Surrogate::Swap,
            count: 1000,
            seed: 0,
            workers: 0,
        }
    }
}

impl SpectrumConfig {
    pub fn validate(&self) -> MineResult<()> {
        if !self.support.is_valid() {
            return Err(MineError::invalid("support threshold must not be negative"));
        }
        if self.min_size > self.max_size {
            return Err(MineError::invalid(format!(
                "minimum size {} exceeds maximum size {}",
                self.min_size, self.max_size
            )));
        }
        if self.count == 0 {
            return Err(MineError::invalid("number of surrogate data sets must be positive"));
        }
        if let Algorithm::Ista(_) = self.algorithm {
            if self.report_mode().is_none() {
                return Err(MineError::invalid(
                    "intersecting transactions finds closed or maximal item sets only",
                ));
            }
        }
        Ok(())
    }

    // Number of data sets actually mined; identity surrogates are the
    // source itself, so mining it more than once adds nothing.
    pub fn effective_count(&self) -> usize {
        match self.surrogate {
            Surrogate::Identity => 1,
            _ => self.count,
        }
    }

    // Factor that turns the summed spectrum into an average per data set.
    pub fn output_scale(&self) -> f64 {
        1.0 / self.effective_count().max(1) as f64
    }

    fn report_mode(&self) -> Option<ReportMode> {
        match self.target {
            Target::Closed => Some(ReportMode::Closed),
            Target::Maximal => Some(ReportMode::Maximal),
            _ => None,
        }
    }
}

// Splits count data sets over at most workers workers: every worker gets
// ceil(count / workers) except the last, and workers left without data
// sets are not used.
pub fn partition(count: usize, workers: usize) -> Vec<usize> {
    let workers = workers.max(1);
    let share = (count + workers - 1) / workers;
    let mut shares = vec![];
    for n in 0..workers {
        let left = count as i64 - (n * share) as i64;
        if left <= 0 {
            break;
        }
        shares.push((left as usize).min(share));
    }
    shares
}

fn worker_count(workers: i32) -> usize {
    if workers > 0 {
        return workers as usize;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// Seed of the worker with index n.
fn worker_seed(base: u64, n: usize) -> u64 {
    base.wrapping_add(n as u64)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(1)
}

// Mines one surrogate data set into the reporter.
fn mine_bag(
    bag: TransactionBag,
    config: &SpectrumConfig,
    min_support: Support,
    reporter: &mut Reporter,
    cancel: &CancelToken,
) -> MineResult<usize> {
    match config.algorithm {
        Algorithm::FpGrowth => mine_fp_growth(&bag, min_support, reporter, cancel),
        Algorithm::Ista(variant) => {
            let target = config
                .report_mode()
                .ok_or_else(|| MineError::invalid("unsupported target"))?;
            let ista_config = IstaConfig {
                target,
                support: Threshold::Absolute(min_support),
                max_support: Threshold::Absolute(Support::MAX),
                min_size: config.min_size,
                max_size: config.max_size,
                variant,
                ..IstaConfig::default()
            };
            match Ista::new(ista_config)?.prepare(bag) {
                Ok(prepared) => prepared.mine(cancel)?.report(reporter),
                // A surrogate without frequent items adds nothing.
                Err(MineError::NoItems) => Ok(0),
                Err(err) => Err(err),
            }
        }
    }
}

struct Worker<'a> {
    source: &'a TransactionBag,
    config: &'a SpectrumConfig,
    min_support: Support,
    template: &'a PatternSpectrum,
    done: &'a AtomicUsize,
    progress: Option<&'a (dyn Fn(usize) + Sync)>,
    cancel: &'a CancelToken,
}

impl<'a> Worker<'a> {
    fn run(&self, count: usize, seed: u64) -> MineResult<PatternSpectrum> {
        let timer = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut spectrum = self.template.clone();
        for _ in 0..count {
            self.cancel.check()?;
            let surrogate = self.config.surrogate.generate(self.source, &mut rng)?;

            let mut reporter = Reporter::new();
            reporter.set_target(self.config.target);
            reporter.set_support_range(self.min_support, Support::MAX);
            reporter.set_size_range(self.config.min_size, self.config.max_size);
            reporter.collect_spectrum(self.template.clone());
            match mine_bag(surrogate, self.config, self.min_support, &mut reporter, self.cancel) {
                Ok(_) => {}
                Err(MineError::Cancelled) => return Err(MineError::Cancelled),
                Err(MineError::OutOfMemory) => return Err(MineError::OutOfMemory),
                Err(err) => return Err(MineError::MiningFailure(err.to_string())),
            }
            if let Some(found) = reporter.take_spectrum() {
                spectrum.add_spectrum(&found)?;
            }

            let completed = self.done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = self.progress {
                progress(completed);
            }
        }
        debug!(
            "Worker with seed {} mined {} surrogate data sets in {} ms.",
            seed,
            count,
            timer.elapsed().as_millis()
        );
        Ok(spectrum)
    }
}

// Generates config.count surrogate data sets of bag, mines each of them and
// sums the pattern spectra. progress receives the number of completed data
// sets.
pub fn generate_spectrum(
    bag: &TransactionBag,
    config: &SpectrumConfig,
    progress: Option<&(dyn Fn(usize) + Sync)>,
    cancel: &CancelToken,
) -> MineResult<PatternSpectrum> {
    config.validate()?;
    if config.surrogate == Surrogate::Shuffle && !bag.is_tabular() {
        return Err(MineError::NotTabular);
    }
    let count = config.effective_count();
    let seed = match config.seed {
        0 => clock_seed(),
        seed => seed,
    };

    let total_weight = bag.total_weight();
    let min_support = config.support.min_count(total_weight);
    let mut source = bag.clone();
    // Shuffling needs every column intact.
    if config.surrogate != Surrogate::Shuffle {
        source.recode(min_support, SortOrder::Decreasing);
    }
    let template = PatternSpectrum::new(
        config.min_size.max(1),
        config.max_size.max(1),
        min_support,
        total_weight.max(min_support),
    )?;

    let workers = worker_count(config.workers);
    let done = AtomicUsize::new(0);
    let worker = Worker {
        source: &source,
        config,
        min_support,
        template: &template,
        done: &done,
        progress,
        cancel,
    };

    let timer = Instant::now();
    let spectra: Vec<MineResult<PatternSpectrum>> = if workers > 1 && count > 1 {
        let shares = partition(count, workers);
        info!(
            "Mining {} surrogate data sets in {} workers...",
            count,
            shares.len()
        );
        let pool = ThreadPoolBuilder::new()
            .num_threads(shares.len())
            .build()
            .map_err(|err| MineError::MiningFailure(err.to_string()))?;
        pool.install(|| {
            shares
                .par_iter()
                .enumerate()
                .map(|(n, &share)| worker.run(share, worker_seed(seed, n)))
                .collect()
        })
    } else {
        info!("Mining {} surrogate data sets...", count);
        vec![worker.run(count, seed)]
    };

    let mut spectrum = template.clone();
    for found in spectra {
        spectrum.add_spectrum(&found?)?;
    }
    info!(
        "Mined {} surrogate data sets in {} seconds.",
        done.load(Ordering::Relaxed),
        timer.elapsed().as_secs()
    );
    Ok(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction_reader::read_transactions;
    use std::io::Cursor;

    fn sample_bag() -> TransactionBag {
        TransactionBag::from_names(&[
            &["a", "b", "c"],
            &["a", "b", "c", "d"],
            &["a", "b"],
            &["b", "c", "d"],
            &["a", "c", "d", "e"],
            &["a", "b", "e"],
            &["c", "d", "e"],
            &["a", "b", "c", "e"],
        ])
    }

    #[test]
    fn test_partition() {
        assert_eq!(partition(7, 3), vec![3, 3, 1]);
        assert_eq!(partition(4, 3), vec![2, 2]);
        assert_eq!(partition(1, 4), vec![1]);
        assert_eq!(partition(9, 3), vec![3, 3, 3]);
        assert_eq!(partition(5, 1), vec![5]);
    }

    #[test]
    fn test_identity_matches_direct_mining() {
        let bag = sample_bag();
        let config = SpectrumConfig {
            surrogate: Surrogate::Identity,
            count: 10,
            workers: 4,
            min_size: 1,
            ..SpectrumConfig::default()
        };
        let spectrum = generate_spectrum(&bag, &config, None, &CancelToken::new()).unwrap();

        let mut reporter = Reporter::new();
        reporter.set_target(Target::Closed);
        reporter.set_support_range(2, Support::MAX);
        reporter.set_size_range(1, usize::MAX);
        reporter.collect_spectrum(PatternSpectrum::new(1, usize::MAX, 2, 8).unwrap());
        mine_fp_growth(&bag, 2, &mut reporter, &CancelToken::new()).unwrap();
        let direct = reporter.take_spectrum().unwrap();
        assert!(direct.total() > 0);
        assert_eq!(spectrum, direct);
    }

    #[test]
    fn test_same_seed_same_spectrum() {
        let bag = sample_bag();
        let config = SpectrumConfig {
            count: 7,
            seed: 42,
            workers: 3,
            ..SpectrumConfig::default()
        };
        let calls = AtomicUsize::new(0);
        let progress: &(dyn Fn(usize) + Sync) = &|_| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let a = generate_spectrum(&bag, &config, Some(progress), &CancelToken::new()).unwrap();
        let b = generate_spectrum(&bag, &config, None, &CancelToken::new()).unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_algorithms_agree() {
        let bag = sample_bag();
        let config = SpectrumConfig {
            count: 4,
            seed: 9,
            workers: 2,
            ..SpectrumConfig::default()
        };
        let fp = generate_spectrum(&bag, &config, None, &CancelToken::new()).unwrap();
        for &variant in &[TreeVariant::Prefix, TreeVariant::Patricia] {
            let ista_config = SpectrumConfig {
                algorithm: Algorithm::Ista(variant),
                ..config.clone()
            };
            let ista = generate_spectrum(&bag, &ista_config, None, &CancelToken::new()).unwrap();
            assert_eq!(fp, ista);
        }
    }

    #[test]
    fn test_shuffle_needs_table() {
        let calls = AtomicUsize::new(0);
        let progress: &(dyn Fn(usize) + Sync) = &|_| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let config = SpectrumConfig {
            surrogate: Surrogate::Shuffle,
            count: 4,
            workers: 2,
            ..SpectrumConfig::default()
        };
        let result = generate_spectrum(&sample_bag(), &config, Some(progress), &CancelToken::new());
        assert!(matches!(result, Err(MineError::NotTabular)));
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        let table = read_transactions(Cursor::new("x 1 p\ny 1 p\nx 2 q\nx 1 q\n"), true).unwrap();
        assert!(generate_spectrum(&table, &config, None, &CancelToken::new()).is_ok());
    }

    #[test]
    fn test_output_scale() {
        let config = SpectrumConfig {
            count: 4,
            ..SpectrumConfig::default()
        };
        assert_eq!(config.effective_count(), 4);
        assert_eq!(config.output_scale(), 0.25);
        let config = SpectrumConfig {
            surrogate: Surrogate::Identity,
            count: 4,
            ..SpectrumConfig::default()
        };
        assert_eq!(config.effective_count(), 1);
        assert_eq!(config.output_scale(), 1.0);
    }

    #[test]
    fn test_seed_near_maximum() {
        assert_eq!(worker_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(worker_seed(u64::MAX, 1), 0);
        assert_eq!(worker_seed(u64::MAX - 1, 3), 1);
        let config = SpectrumConfig {
            count: 4,
            workers: 2,
            seed: u64::MAX,
            ..SpectrumConfig::default()
        };
        assert!(generate_spectrum(&sample_bag(), &config, None, &CancelToken::new()).is_ok());
    }

    #[test]
    fn test_cancel_while_running() {
        let cancel = CancelToken::new();
        let stopper = cancel.clone();
        // Runs on the worker threads; the first finished data set stops all.
        let progress: &(dyn Fn(usize) + Sync) = &move |_| stopper.cancel();
        let config = SpectrumConfig {
            count: 10000,
            workers: 4,
            seed: 3,
            ..SpectrumConfig::default()
        };
        let result = generate_spectrum(&sample_bag(), &config, Some(progress), &cancel);
        assert!(matches!(result, Err(MineError::Cancelled)));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let cancel = CancelToken::new();
        let stopper = cancel.clone();
        let started = AtomicUsize::new(0);
        let progress: &(dyn Fn(usize) + Sync) = &|_| {
            started.fetch_add(1, Ordering::Relaxed);
        };
        let config = SpectrumConfig {
            count: 1_000_000,
            workers: 2,
            seed: 5,
            ..SpectrumConfig::default()
        };
        let result = std::thread::scope(|scope| {
            scope.spawn(|| {
                while started.load(Ordering::Relaxed) == 0 {
                    std::thread::yield_now();
                }
                stopper.cancel();
            });
            generate_spectrum(&sample_bag(), &config, Some(progress), &cancel)
        });
        assert!(matches!(result, Err(MineError::Cancelled)));
    }

    #[test]
    fn test_invalid_and_cancelled() {
        let config = SpectrumConfig {
            algorithm: Algorithm::Ista(TreeVariant::Prefix),
            target: Target::Frequent,
            ..SpectrumConfig::default()
        };
        assert!(matches!(
            generate_spectrum(&sample_bag(), &config, None, &CancelToken::new()),
            Err(MineError::InvalidConfiguration(_))
        ));

        let cancel = CancelToken::new();
        cancel.cancel();
        let config = SpectrumConfig {
            count: 4,
            workers: 2,
            ..SpectrumConfig::default()
        };
        assert!(matches!(
            generate_spectrum(&sample_bag(), &config, None, &cancel),
            Err(MineError::Cancelled)
        ));
    }
}
