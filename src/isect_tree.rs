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

//! Repository of closed item sets built by intersecting transactions.

use crate::error::MineResult;
use crate::item::{Item, Support};
use crate::item_counter::ItemCounter;
use crate::patricia_tree::PatriciaTree;
use crate::prefix_tree::PrefixTree;
use crate::report::Reporter;
use fnv::FnvHashMap;
use std::cmp;

/// Storage of item sets with their supports.
pub trait SetStore {
    // Stores items (sorted, non-empty) with the larger of support and the
    // support already stored for it.
    fn store(&mut self, items: &[Item], support: Support) -> MineResult<()>;
    // Visits every stored set as (set ∩ marked items, support).
    fn scan(&self, marks: &[bool], visit: &mut dyn FnMut(&[Item], Support));
    fn for_each(&self, visit: &mut dyn FnMut(&[Item], Support));
    // Drops every stored set rejected by keep and frees unused nodes.
    fn retain(&mut self, keep: &mut dyn FnMut(&[Item], Support) -> bool);
    // Whether a proper superset of items is stored with at least
    // min_support.
    fn has_superset(&self, items: &[Item], min_support: Support) -> bool;
    fn node_count(&self) -> usize;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TreeVariant {
    Prefix,
    Patricia,
    // Patricia for bags with fewer transactions than items.
    Auto,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReportMode {
    Closed,
    Maximal,
}

pub trait IntersectionTree {
    // Adds a transaction: stores its intersections with all stored sets and
    // the transaction itself, skipping sets that can no longer become
    // frequent. frequencies are the remaining item frequencies including
    // this transaction.
    fn isect(
        &mut self,
        items: &[Item],
        weight: Support,
        min_support: Support,
        frequencies: &ItemCounter,
    ) -> MineResult<()>;

    // Drops sets whose support cannot reach min_support with the remaining
    // item frequencies.
    fn prune_infeasible(&mut self, min_support: Support, frequencies: &ItemCounter);

    // Drops sets with a support below min_support.
    fn prune(&mut self, min_support: Support);

    fn report(
        &self,
        mode: ReportMode,
        min_support: Support,
        reporter: &mut Reporter,
    ) -> MineResult<usize>;

    fn node_count(&self) -> usize;
}

pub struct IsectTree<S> {
    repo: S,
    marks: Vec<bool>,
    candidates: FnvHashMap<Vec<Item>, Support>,
}

impl<S: SetStore + Default> IsectTree<S> {
    pub fn new(item_count: usize) -> IsectTree<S> {
        IsectTree {
            repo: S::default(),
            marks: vec![false; item_count],
            candidates: FnvHashMap::default(),
        }
    }
}

pub fn new_tree(variant: TreeVariant, item_count: usize) -> Box<dyn IntersectionTree + Send> {
    match variant {
        TreeVariant::Patricia => Box::new(IsectTree::<PatriciaTree>::new(item_count)),
        _ => Box::new(IsectTree::<PrefixTree>::new(item_count)),
    }
}

fn add_candidate(
    candidates: &mut FnvHashMap<Vec<Item>, Support>,
    items: &[Item],
    support: Support,
) -> MineResult<()> {
    if let Some(existing) = candidates.get_mut(items) {
        *existing = cmp::max(*existing, support);
        return Ok(());
    }
    candidates.try_reserve(1)?;
    candidates.insert(items.to_vec(), support);
    Ok(())
}

impl<S: SetStore> IntersectionTree for IsectTree<S> {
    fn isect(
        &mut self,
        items: &[Item],
        weight: Support,
        min_support: Support,
        frequencies: &ItemCounter,
    ) -> MineResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        if let Some(last) = items.last() {
            if self.marks.len() <= last.as_index() {
                self.marks.resize(last.as_index() + 1, false);
            }
        }
        for item in items {
            self.marks[item.as_index()] = true;
        }

        self.candidates.clear();
        let candidates = &mut self.candidates;
        let mut result = Ok(());
        self.repo.scan(&self.marks, &mut |isect, support| {
            if isect.is_empty() || result.is_err() {
                return;
            }
            result = add_candidate(candidates, isect, support.saturating_add(weight));
        });
        for item in items {
            self.marks[item.as_index()] = false;
        }
        result?;
        add_candidate(&mut self.candidates, items, weight)?;

        for (set, support) in self.candidates.drain() {
            let bound = frequencies.max_of(&set).saturating_sub(weight);
            if support.saturating_add(bound) >= min_support {
                self.repo.store(&set, support)?;
            }
        }
        Ok(())
    }

    fn prune_infeasible(&mut self, min_support: Support, frequencies: &ItemCounter) {
        self.repo.retain(&mut |items, support| {
            support.saturating_add(frequencies.max_of(items)) >= min_support
        });
    }

    fn prune(&mut self, min_support: Support) {
        self.repo.retain(&mut |_, support| support >= min_support);
    }

    fn report(
        &self,
        mode: ReportMode,
        min_support: Support,
        reporter: &mut Reporter,
    ) -> MineResult<usize> {
        let mut sets: Vec<(Vec<Item>, Support)> = vec![];
        self.repo.for_each(&mut |items, support| {
            if support >= min_support {
                sets.push((items.to_vec(), support));
            }
        });
        sets.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        let mut count = 0;
        for (items, support) in sets {
            if mode == ReportMode::Maximal && self.repo.has_superset(&items, min_support) {
                continue;
            }
            if reporter.report(&items, support)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn node_count(&self) -> usize {
        self.repo.node_count()
    }
}
