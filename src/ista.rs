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

//! Closed and maximal item set mining by intersecting transactions (IsTa).
//!
//! The miner moves through its stages by value:
//!
//! ```text
//! Ista<Created> --prepare--> Ista<Prepared> --mine--> Ista<Built> --report--> count
//! ```
//!
//! Dropping the miner at any stage releases the repository and the item
//! frequencies.

use crate::cancel::CancelToken;
use crate::error::{MineError, MineResult};
use crate::isect_tree::{new_tree, IntersectionTree, ReportMode, TreeVariant};
use crate::item::Support;
use crate::report::{Evaluation, Reporter};
use crate::tabag::{SortOrder, Threshold, TransactionBag};
use std::time::Instant;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct IstaConfig {
    pub target: ReportMode,
    pub support: Threshold,
    pub max_support: Threshold,
    pub min_size: usize,
    pub max_size: usize,
    // Minimum binary logarithm of the support quotient, if evaluated.
    pub log_ratio: Option<f64>,
    pub variant: TreeVariant,
    // Prune the repository periodically while intersecting.
    pub prune: bool,
    // Remove infrequent sets from the repository before reporting.
    pub filter: bool,
    pub order: SortOrder,
}

impl Default for IstaConfig {
    fn default() -> Self {
        IstaConfig {
            target: ReportMode::Closed,
            support: Threshold::Percent(10.0),
            max_support: Threshold::Percent(100.0),
            min_size: 1,
            max_size: usize::MAX,
            log_ratio: None,
            variant: TreeVariant::Auto,
            prune: true,
            filter: false,
            order: SortOrder::Increasing,
        }
    }
}

impl IstaConfig {
    pub fn validate(&self) -> MineResult<()> {
        if !self.support.is_valid() || !self.max_support.is_valid() {
            return Err(MineError::invalid("support thresholds must not be negative"));
        }
        if self.min_size > self.max_size {
            return Err(MineError::invalid(format!(
                "minimum size {} exceeds maximum size {}",
                self.min_size, self.max_size
            )));
        }
        if let Some(threshold) = self.log_ratio {
            if threshold.is_nan() {
                return Err(MineError::invalid("evaluation threshold is not a number"));
            }
        }
        Ok(())
    }
}

pub struct Created;

pub struct Prepared {
    bag: TransactionBag,
}

pub struct Built {
    tree: Box<dyn IntersectionTree + Send>,
    item_supports: Vec<Support>,
    total_weight: Support,
}

pub struct Ista<S> {
    config: IstaConfig,
    min_support: Support,
    max_support: Support,
    stage: S,
}

impl Ista<Created> {
    pub fn new(config: IstaConfig) -> MineResult<Ista<Created>> {
        config.validate()?;
        Ok(Ista {
            config,
            min_support: 1,
            max_support: Support::MAX,
            stage: Created,
        })
    }

    // Recodes items by frequency and removes infrequent ones, drops short
    // transactions and merges duplicates.
    pub fn prepare(self, mut bag: TransactionBag) -> MineResult<Ista<Prepared>> {
        let timer = Instant::now();
        let total_weight = bag.total_weight();
        let min_support = self.config.support.min_count(total_weight);
        let max_support = self.config.max_support.max_count(total_weight);

        let item_count = bag.recode(min_support, self.config.order);
        if item_count == 0 {
            return Err(MineError::NoItems);
        }
        bag.drop_shorter_than(self.config.min_size);
        // Leaves the transactions sorted by increasing size.
        bag.reduce();
        debug!(
            "Prepared {} transactions over {} items in {} ms.",
            bag.count(),
            item_count,
            timer.elapsed().as_millis()
        );

        Ok(Ista {
            config: self.config,
            min_support,
            max_support,
            stage: Prepared { bag },
        })
    }
}

impl Ista<Prepared> {
    pub fn bag(&self) -> &TransactionBag {
        &self.stage.bag
    }

    fn variant(&self) -> TreeVariant {
        match self.config.variant {
            TreeVariant::Auto if self.stage.bag.count() < self.stage.bag.item_count() => {
                TreeVariant::Patricia
            }
            TreeVariant::Auto => TreeVariant::Prefix,
            variant => variant,
        }
    }

    // Intersects all transactions in increasing size order into the
    // repository.
    pub fn mine(self, cancel: &CancelToken) -> MineResult<Ista<Built>> {
        let timer = Instant::now();
        let bag = &self.stage.bag;
        let min_support = self.min_support;
        let mut frequencies = bag.item_frequencies();
        let item_supports = frequencies.as_slice().to_vec();
        let mut tree = new_tree(self.variant(), bag.item_count());

        // Items that became infrequent since the last pruning.
        let mut infeasible = 0;
        for (index, transaction) in bag.transactions().iter().enumerate() {
            cancel.check()?;
            tree.isect(
                &transaction.items,
                transaction.weight,
                min_support,
                &frequencies,
            )?;
            for item in &transaction.items {
                if frequencies.sub(item, transaction.weight) < min_support {
                    infeasible += 1;
                }
            }
            if self.config.prune && min_support >= 4 && infeasible > 0 && (index & 0x0f) == 0x0f
            {
                tree.prune_infeasible(min_support, &frequencies);
                infeasible = 0;
            }
        }
        debug!(
            "Intersected {} transactions into {} nodes in {} ms.",
            bag.count(),
            tree.node_count(),
            timer.elapsed().as_millis()
        );

        Ok(Ista {
            min_support,
            max_support: self.max_support,
            stage: Built {
                tree,
                item_supports,
                total_weight: bag.total_weight(),
            },
            config: self.config,
        })
    }
}

impl Ista<Built> {
    pub fn node_count(&self) -> usize {
        self.stage.tree.node_count()
    }

    // Sets the support and size ranges and the evaluation of the reporter.
    pub fn configure_reporter(&self, reporter: &mut Reporter) {
        reporter.set_support_range(self.min_support, self.max_support);
        reporter.set_size_range(self.config.min_size, self.config.max_size);
        if let Some(threshold) = self.config.log_ratio {
            reporter.set_evaluation(Evaluation::LogRatio {
                threshold,
                item_supports: self.stage.item_supports.clone(),
                total_weight: self.stage.total_weight,
            });
        }
    }

    // Hands the closed or maximal item sets to the reporter and returns
    // their number.
    pub fn report(mut self, reporter: &mut Reporter) -> MineResult<usize> {
        let timer = Instant::now();
        self.configure_reporter(reporter);
        let mode = self.config.target;
        if self.config.filter && mode == ReportMode::Maximal {
            self.stage.tree.prune(self.min_support);
            debug!(
                "Pruned repository to {} nodes.",
                self.stage.tree.node_count()
            );
        }
        let count = self.stage.tree.report(mode, self.min_support, reporter)?;
        debug!(
            "Reported {} item sets in {} ms.",
            count,
            timer.elapsed().as_millis()
        );
        Ok(count)
    }
}
