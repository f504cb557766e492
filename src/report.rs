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

//! Item set reporter: the sink every miner writes its patterns into.

use crate::error::{MineError, MineResult};
use crate::fptree::ItemSet;
use crate::item::{Item, Support, SUPPORT_MAX};
use crate::pattern_spectrum::PatternSpectrum;
use crate::vec_sets::split_out_item;
use fnv::FnvHashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Frequent,
    Closed,
    Maximal,
    Generators,
}

impl Target {
    pub fn from_char(c: char) -> MineResult<Target> {
        match c {
            's' | 'a' | 'f' => Ok(Target::Frequent),
            'c' => Ok(Target::Closed),
            'm' => Ok(Target::Maximal),
            'g' => Ok(Target::Generators),
            _ => Err(MineError::invalid(format!("invalid target type '{}'", c))),
        }
    }
}

/// Additional evaluation measure for reported item sets.
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    None,
    // Binary logarithm of the ratio of the support to the support expected
    // under item independence.
    LogRatio {
        threshold: f64,
        item_supports: Vec<Support>,
        total_weight: Support,
    },
}

impl Evaluation {
    pub fn value(&self, items: &[Item], support: Support) -> Option<f64> {
        match self {
            Evaluation::None => None,
            Evaluation::LogRatio {
                item_supports,
                total_weight,
                ..
            } => {
                if items.len() < 2 || support == 0 {
                    return Some(0.0);
                }
                let w = (*total_weight as f64).log2();
                let mut value = (support as f64).log2() - w;
                for item in items {
                    let s = item_supports.get(item.as_index()).cloned().unwrap_or(0);
                    if s == 0 {
                        return Some(f64::INFINITY);
                    }
                    value -= (s as f64).log2() - w;
                }
                Some(value)
            }
        }
    }

    fn accepts(&self, items: &[Item], support: Support) -> bool {
        match (self, self.value(items, support)) {
            (Evaluation::LogRatio { threshold, .. }, Some(value)) => value >= *threshold,
            _ => true,
        }
    }
}

pub struct Reporter {
    target: Target,
    min_support: Support,
    max_support: Support,
    min_size: usize,
    max_size: usize,
    evaluation: Evaluation,
    border: Vec<Support>,
    spectrum: Option<PatternSpectrum>,
    patterns: Option<Vec<ItemSet>>,
    count: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new()
    }
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter {
            target: Target::Frequent,
            min_support: 1,
            max_support: SUPPORT_MAX,
            min_size: 1,
            max_size: usize::MAX,
            evaluation: Evaluation::None,
            border: vec![],
            spectrum: None,
            patterns: None,
            count: 0,
        }
    }

    pub fn set_support_range(&mut self, min: Support, max: Support) {
        self.min_support = min.max(1);
        self.max_support = max;
    }

    pub fn set_size_range(&mut self, min: usize, max: usize) {
        self.min_size = min.max(1);
        self.max_size = max;
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn size_range(&self) -> (usize, usize) {
        (self.min_size, self.max_size)
    }

    pub fn set_evaluation(&mut self, evaluation: Evaluation) {
        self.evaluation = evaluation;
    }

    // Minimum support an item set of the given size must reach to be
    // reported. Sizes without an entry are unrestricted.
    pub fn set_border(&mut self, size: usize, support: Support) {
        if self.border.len() <= size {
            self.border.resize(size + 1, 0);
        }
        self.border[size] = support;
    }

    // Every reported item set is also counted in spectrum; sets outside its
    // ranges are not counted.
    pub fn collect_spectrum(&mut self, spectrum: PatternSpectrum) {
        self.spectrum = Some(spectrum);
    }

    pub fn collect_patterns(&mut self) {
        self.patterns = Some(vec![]);
    }

    pub fn take_spectrum(&mut self) -> Option<PatternSpectrum> {
        self.spectrum.take()
    }

    pub fn take_patterns(&mut self) -> Vec<ItemSet> {
        self.patterns.take().unwrap_or_default()
    }

    // Number of item sets reported so far.
    pub fn count(&self) -> usize {
        self.count
    }

    fn in_ranges(&self, items: &[Item], support: Support) -> bool {
        let size = items.len();
        size >= self.min_size
            && size <= self.max_size
            && support >= self.min_support
            && support <= self.max_support
            && self.border.get(size).map_or(true, |&b| support >= b)
            && self.evaluation.accepts(items, support)
    }

    // Reports one item set that already satisfies the target type.
    // Returns whether it passed the range, border and evaluation filters.
    pub fn report(&mut self, items: &[Item], support: Support) -> MineResult<bool> {
        if !self.in_ranges(items, support) {
            return Ok(false);
        }
        if let Some(ref mut spectrum) = self.spectrum {
            spectrum.add_count(items.len(), support, 1)?;
        }
        if let Some(ref mut patterns) = self.patterns {
            patterns.try_reserve(1)?;
            patterns.push(ItemSet::new(items.to_vec(), support));
        }
        self.count += 1;
        Ok(true)
    }

    // Reports the subset of a complete collection of frequent item sets
    // that matches the target type.
    pub fn report_frequent(&mut self, itemsets: &[ItemSet]) -> MineResult<usize> {
        let selected = filter_target(itemsets, self.target);
        let mut reported = 0;
        for itemset in selected {
            if self.report(&itemset.items, itemset.support)? {
                reported += 1;
            }
        }
        Ok(reported)
    }
}

// Selects closed, maximal or generator sets from a downward closed
// collection of frequent item sets. Only direct neighbours (one item more
// or less) need to be inspected because support is antimonotone.
pub fn filter_target(itemsets: &[ItemSet], target: Target) -> Vec<&ItemSet> {
    if target == Target::Frequent {
        return itemsets.iter().collect();
    }
    let index: FnvHashMap<&[Item], usize> = itemsets
        .iter()
        .enumerate()
        .map(|(i, s)| (s.items.as_slice(), i))
        .collect();
    let mut closed = vec![true; itemsets.len()];
    let mut maximal = vec![true; itemsets.len()];
    let mut generator = vec![true; itemsets.len()];
    for (i, itemset) in itemsets.iter().enumerate() {
        for &item in &itemset.items {
            let subset = split_out_item(&itemset.items, item);
            if let Some(&k) = index.get(subset.as_slice()) {
                maximal[k] = false;
                if itemsets[k].support == itemset.support {
                    closed[k] = false;
                    generator[i] = false;
                }
            }
        }
    }
    let keep = match target {
        Target::Closed => closed,
        Target::Maximal => maximal,
        Target::Generators => generator,
        Target::Frequent => unreachable!(),
    };
    itemsets
        .iter()
        .zip(keep)
        .filter(|(_, keep)| *keep)
        .map(|(s, _)| s)
        .collect()
}
