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

//! Pattern set reduction: removes patterns that are better explained by a
//! subset or superset, judged by a preference policy and a decision border
//! (the minimum support a pattern of each size needs to be significant).

use crate::cancel::CancelToken;
use crate::error::{MineError, MineResult};
use crate::item::{Item, Support, SUPPORT_MAX};
use crate::itemizer::Itemizer;
use crate::vec_sets::{intersection_into, is_proper_subset};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preference {
    PreferA,
    PreferB,
    Neither,
}

/// Size and support of a pattern, all the preference policies look at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub size: usize,
    pub support: Support,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reduction {
    None,
    // Excess coincidences of the superset must be significant.
    Coins0,
    Coins1,
    // Excess items of the superset must be significant.
    Items2,
    // Larger number of covered item instances wins.
    Cover0,
    Cover1,
    Lenient0,
    Lenient1,
    Strict0,
    Strict1,
}

// Border lookups past the largest size read the largest size's entry.
fn border_at(border: &[Support], size: usize) -> Support {
    match border.get(size) {
        Some(&support) => support,
        None => border.last().cloned().unwrap_or(0),
    }
}

impl Reduction {
    pub fn from_id(id: u32) -> MineResult<Reduction> {
        Ok(match id {
            0 => Reduction::None,
            1 => Reduction::Coins0,
            2 => Reduction::Coins1,
            3 => Reduction::Items2,
            4 => Reduction::Cover0,
            5 => Reduction::Cover1,
            6 => Reduction::Lenient0,
            7 => Reduction::Lenient1,
            8 => Reduction::Strict0,
            9 => Reduction::Strict1,
            _ => return Err(MineError::invalid(format!("invalid reduction method {}", id))),
        })
    }

    // Compares a superset a with a subset b.
    pub fn prefer(self, a: Signature, b: Signature, border: &[Support]) -> Preference {
        use self::Preference::*;
        if self == Reduction::None {
            return Neither;
        }
        if a.support >= b.support {
            return PreferA;
        }
        let pick = |a_wins: bool| if a_wins { PreferA } else { PreferB };
        let cover = |offset: u64| {
            let a_cover = (a.size as u64).saturating_sub(offset) * a.support as u64;
            let b_cover = (b.size as u64).saturating_sub(offset) * b.support as u64;
            pick(a_cover >= b_cover)
        };
        // Whether the superset's excess items, resp. the subset's excess
        // coincidences, are explainable as chance.
        let items_explained = a.support < border_at(border, a.size.saturating_sub(b.size) + 2);
        let coins_explained = b.support - a.support + 1 < border_at(border, b.size);
        match self {
            Reduction::None => Neither,
            Reduction::Coins0 => pick(b.support - a.support < border_at(border, b.size)),
            Reduction::Coins1 => pick(coins_explained),
            Reduction::Items2 => pick(!items_explained),
            Reduction::Cover0 => cover(0),
            Reduction::Cover1 => cover(1),
            Reduction::Lenient0 | Reduction::Lenient1 | Reduction::Strict0 | Reduction::Strict1 => {
                match (items_explained, coins_explained) {
                    (true, false) => PreferB,
                    (false, true) => PreferA,
                    (false, false)
                        if self == Reduction::Lenient0 || self == Reduction::Lenient1 =>
                    {
                        Neither
                    }
                    _ if self == Reduction::Lenient0 || self == Reduction::Strict0 => cover(0),
                    _ => cover(1),
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Pattern<O> {
    start: usize,
    size: usize,
    support: Support,
    // None once the pattern is discarded.
    orig: Option<O>,
}

impl<O> Pattern<O> {
    fn signature(&self) -> Signature {
        Signature {
            size: self.size,
            support: self.support,
        }
    }
}

/// A fixed capacity set of frequent patterns, each with an opaque
/// back-reference to the caller's pattern object.
///
/// Patterns are either added whole with `add_pattern`, or, for sets created
/// with an item map, item by item with `begin_pattern`, `add_item` and
/// `finish_pattern`.
pub struct PatternSet<O> {
    items: Vec<Item>,
    patterns: Vec<Pattern<O>>,
    capacity: usize,
    border: Vec<Support>,
    itemizer: Option<Itemizer>,
    // Item instances still available to the item by item path.
    remaining: usize,
    open: bool,
}

impl<O> PatternSet<O> {
    fn with_parts(capacity: usize, max_size: usize, itemizer: Option<Itemizer>, extent: usize) -> Self {
        let max_size = max_size.max(2);
        let mut border = vec![0; max_size + 1];
        border[0] = SUPPORT_MAX;
        border[1] = SUPPORT_MAX;
        PatternSet {
            items: vec![],
            patterns: Vec::with_capacity(capacity),
            capacity,
            border,
            itemizer,
            remaining: extent,
            open: false,
        }
    }

    pub fn new(capacity: usize, max_size: usize) -> PatternSet<O> {
        PatternSet::with_parts(capacity, max_size, None, 0)
    }

    // A set filled item by item; item keys are resolved through itemizer and
    // at most extent item instances may be added.
    pub fn with_itemizer(
        capacity: usize,
        max_size: usize,
        extent: usize,
        itemizer: Itemizer,
    ) -> PatternSet<O> {
        PatternSet::with_parts(capacity, max_size, Some(itemizer), extent)
    }

    #[cfg(test)]
    pub fn max_size(&self) -> usize {
        self.border.len() - 1
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[cfg(test)]
    pub fn itemizer(&self) -> Option<&Itemizer> {
        self.itemizer.as_ref()
    }

    // Sizes beyond the maximum pattern size are ignored.
    pub fn set_border(&mut self, size: usize, support: Support) {
        if let Some(entry) = self.border.get_mut(size) {
            *entry = support;
        }
    }

    #[cfg(test)]
    pub fn border(&self, size: usize) -> Support {
        border_at(&self.border, size)
    }

    #[cfg(test)]
    pub fn items(&self, index: usize) -> &[Item] {
        pattern_items(&self.items, &self.patterns[index])
    }

    #[cfg(test)]
    pub fn support(&self, index: usize) -> Support {
        self.patterns[index].support
    }

    #[cfg(test)]
    pub fn orig(&self, index: usize) -> Option<&O> {
        self.patterns[index].orig.as_ref()
    }

    // Patterns that have not been discarded.
    pub fn kept(&self) -> impl Iterator<Item = (&[Item], Support, &O)> + '_ {
        self.patterns.iter().filter_map(move |p| {
            p.orig
                .as_ref()
                .map(|orig| (pattern_items(&self.items, p), p.support, orig))
        })
    }

    pub fn kept_count(&self) -> usize {
        self.patterns.iter().filter(|p| p.orig.is_some()).count()
    }

    fn check_room(&self) -> MineResult<()> {
        if self.patterns.len() >= self.capacity {
            return Err(MineError::invalid(format!(
                "pattern set is full ({} patterns)",
                self.capacity
            )));
        }
        Ok(())
    }

    pub fn add_pattern(&mut self, items: &[Item], support: Support, orig: O) -> MineResult<()> {
        if self.itemizer.is_some() {
            return Err(MineError::invalid(
                "patterns of an item mapped set are added item by item",
            ));
        }
        self.check_room()?;
        let start = self.items.len();
        self.items.try_reserve(items.len())?;
        self.items.extend_from_slice(items);
        self.items[start..].sort();
        self.patterns.push(Pattern {
            start,
            size: items.len(),
            support,
            orig: Some(orig),
        });
        Ok(())
    }

    pub fn begin_pattern(&mut self, orig: O) -> MineResult<()> {
        if self.itemizer.is_none() {
            return Err(MineError::invalid("pattern set has no item map"));
        }
        if self.open {
            return Err(MineError::invalid("previous pattern is not finished"));
        }
        self.check_room()?;
        self.patterns.push(Pattern {
            start: self.items.len(),
            size: 0,
            support: 0,
            orig: Some(orig),
        });
        self.open = true;
        Ok(())
    }

    pub fn add_item(&mut self, key: &str) -> MineResult<Item> {
        if !self.open {
            return Err(MineError::invalid("no pattern has been begun"));
        }
        if self.remaining == 0 {
            return Err(MineError::invalid("item instance budget exhausted"));
        }
        let item = match self.itemizer {
            Some(ref mut itemizer) => itemizer.id_of(key),
            None => return Err(MineError::invalid("pattern set has no item map")),
        };
        self.items.try_reserve(1)?;
        self.items.push(item);
        self.remaining -= 1;
        if let Some(p) = self.patterns.last_mut() {
            p.size += 1;
        }
        Ok(item)
    }

    pub fn finish_pattern(&mut self, support: Support) -> MineResult<()> {
        if !self.open {
            return Err(MineError::invalid("no pattern has been begun"));
        }
        self.open = false;
        if let Some(p) = self.patterns.last_mut() {
            p.support = support;
            self.items[p.start..p.start + p.size].sort();
        }
        Ok(())
    }

    // Sorts the patterns by size, then items, and discards every pattern the
    // policy disfavors against a subset or superset of it. With add_isects
    // the proper intersections of patterns that were not mined themselves
    // but reach the decision border are compared against their supersets.
    // Cancellation stops early and leaves a partially reduced set. Returns
    // the number of kept patterns.
    pub fn reduce(&mut self, method: Reduction, add_isects: bool, cancel: &CancelToken) -> usize {
        if method == Reduction::None {
            return self.kept_count();
        }
        let timer = Instant::now();
        let items = &self.items;
        let patterns = &mut self.patterns;
        patterns.sort_by(|a, b| cmp_patterns(pattern_items(items, a), pattern_items(items, b)));

        let mut buffer: Vec<Item> = vec![];
        for i in 1..patterns.len() {
            if cancel.is_cancelled() {
                break;
            }
            for k in 0..i {
                if patterns[i].orig.is_none() && patterns[k].orig.is_none() {
                    continue;
                }
                let subset = pattern_items(items, &patterns[k]);
                if intersection_into(subset, pattern_items(items, &patterns[i]), &mut buffer) == 0 {
                    continue;
                }
                if buffer.len() < patterns[k].size {
                    let isect = Signature {
                        size: buffer.len(),
                        support: patterns[k].support.max(patterns[i].support),
                    };
                    if !add_isects || isect.support < border_at(&self.border, isect.size) {
                        continue;
                    }
                    let start = match patterns
                        .binary_search_by(|p| cmp_patterns(pattern_items(items, p), &buffer))
                    {
                        // Mined patterns are compared directly.
                        Ok(_) => continue,
                        Err(start) => start,
                    };
                    for p in patterns[start..].iter_mut() {
                        if is_proper_subset(&buffer, pattern_items(items, p))
                            && method.prefer(p.signature(), isect, &self.border)
                                == Preference::PreferB
                        {
                            p.orig = None;
                        }
                    }
                } else {
                    let superset = patterns[i].signature();
                    let subset = patterns[k].signature();
                    match method.prefer(superset, subset, &self.border) {
                        Preference::PreferA => patterns[k].orig = None,
                        Preference::PreferB => patterns[i].orig = None,
                        Preference::Neither => {}
                    }
                }
            }
        }
        let kept = self.kept_count();
        debug!(
            "Reduced {} patterns to {} in {} ms.",
            self.patterns.len(),
            kept,
            timer.elapsed().as_millis()
        );
        kept
    }
}

fn pattern_items<'a, O>(items: &'a [Item], p: &Pattern<O>) -> &'a [Item] {
    &items[p.start..p.start + p.size]
}

fn cmp_patterns(a: &[Item], b: &[Item]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::to_item_vec;
    use proptest::prelude::*;

    fn sig(size: usize, support: Support) -> Signature {
        Signature { size, support }
    }

    fn pattern_set(patterns: &[(&[u32], Support)], border: &[(usize, Support)]) -> PatternSet<usize> {
        let mut set = PatternSet::new(patterns.len(), 4);
        for (n, (items, support)) in patterns.iter().enumerate() {
            set.add_pattern(&to_item_vec(items), *support, n).unwrap();
        }
        for &(size, support) in border {
            set.set_border(size, support);
        }
        set
    }

    fn kept_origs(set: &PatternSet<usize>) -> Vec<usize> {
        let mut origs: Vec<usize> = set.kept().map(|(_, _, &orig)| orig).collect();
        origs.sort();
        origs
    }

    #[test]
    fn test_border_defaults() {
        let mut set: PatternSet<()> = PatternSet::new(1, 0);
        assert_eq!(set.max_size(), 2);
        assert_eq!(set.border(0), SUPPORT_MAX);
        assert_eq!(set.border(1), SUPPORT_MAX);
        assert_eq!(set.border(2), 0);
        set.set_border(2, 7);
        set.set_border(9, 3);
        assert_eq!(set.border(2), 7);
        assert_eq!(set.border(100), 7);
    }

    #[test]
    fn test_policies() {
        let border = vec![SUPPORT_MAX, SUPPORT_MAX, 4, 3, 2];
        let superset = sig(3, 6);
        let subset = sig(2, 10);
        let cases = [
            (Reduction::None, Preference::Neither),
            // 10 - 6 = 4 is not below border[2] = 4.
            (Reduction::Coins0, Preference::PreferB),
            // 10 - 6 + 1 = 5 is not below 4.
            (Reduction::Coins1, Preference::PreferB),
            // 6 is not below border[3] = 3.
            (Reduction::Items2, Preference::PreferA),
            // 18 < 20.
            (Reduction::Cover0, Preference::PreferB),
            // 12 > 10.
            (Reduction::Cover1, Preference::PreferA),
            (Reduction::Lenient0, Preference::Neither),
            (Reduction::Lenient1, Preference::Neither),
            (Reduction::Strict0, Preference::PreferB),
            (Reduction::Strict1, Preference::PreferA),
        ];
        for &(method, expected) in cases.iter() {
            assert_eq!(method.prefer(superset, subset, &border), expected, "{:?}", method);
            // Equal or larger superset support always keeps the superset.
            if method != Reduction::None {
                assert_eq!(
                    method.prefer(sig(3, 10), subset, &border),
                    Preference::PreferA
                );
            }
        }
        for id in 0..10 {
            assert!(Reduction::from_id(id).is_ok());
        }
        assert!(Reduction::from_id(10).is_err());
    }

    #[test]
    fn test_lenient_explained() {
        let border = vec![SUPPORT_MAX, SUPPORT_MAX, 4, 3, 2];
        // Superset support 2 is below border[3]; 9 - 2 + 1 is not below 4.
        assert_eq!(
            Reduction::Lenient0.prefer(sig(3, 2), sig(2, 9), &border),
            Preference::PreferB
        );
        // Superset support 5 is significant; 6 - 5 + 1 is below 4.
        assert_eq!(
            Reduction::Lenient0.prefer(sig(3, 5), sig(2, 6), &border),
            Preference::PreferA
        );
    }

    #[test]
    fn test_reduce_subsets() {
        let mut set = pattern_set(&[(&[1, 2, 3], 8), (&[1, 2], 10), (&[4, 5], 3)], &[(2, 5)]);
        // 10 - 8 is below the pair border of 5: the pair is explained by {1,2,3}.
        assert_eq!(set.reduce(Reduction::Coins0, false, &CancelToken::new()), 2);
        assert_eq!(kept_origs(&set), vec![0, 2]);

        let mut set = pattern_set(&[(&[1, 2, 3], 8), (&[1, 2], 10)], &[(3, 1)]);
        assert_eq!(set.reduce(Reduction::Coins0, false, &CancelToken::new()), 1);
        assert_eq!(kept_origs(&set), vec![1]);
        // Discarded patterns stay in the set.
        assert_eq!(set.len(), 2);
        assert_eq!(set.items(0), to_item_vec(&[1, 2]).as_slice());
    }

    #[test]
    fn test_reduce_intersections() {
        let patterns: &[(&[u32], Support)] = &[(&[1, 2, 3], 5), (&[1, 2, 4], 6)];
        let mut set = pattern_set(patterns, &[(2, 1)]);
        assert_eq!(set.reduce(Reduction::Coins0, false, &CancelToken::new()), 2);

        let mut set = pattern_set(patterns, &[(2, 1)]);
        // {1,2} with support 6 explains {1,2,3} but not {1,2,4}.
        assert_eq!(set.reduce(Reduction::Coins0, true, &CancelToken::new()), 1);
        assert_eq!(kept_origs(&set), vec![1]);

        // Below the border the intersection is ignored.
        let mut set = pattern_set(patterns, &[(2, 7)]);
        assert_eq!(set.reduce(Reduction::Coins0, true, &CancelToken::new()), 2);

        // A mined intersection is handled by the subset comparisons.
        let mut set = pattern_set(&[(&[1, 2, 3], 5), (&[1, 2, 4], 6), (&[1, 2], 6)], &[(2, 1)]);
        assert_eq!(set.reduce(Reduction::Coins0, true, &CancelToken::new()), 1);
        assert_eq!(kept_origs(&set), vec![1]);
    }

    #[test]
    fn test_cancelled_reduce() {
        let mut set = pattern_set(&[(&[1, 2, 3], 8), (&[1, 2], 10)], &[(3, 1)]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(set.reduce(Reduction::Coins0, false, &cancel), 2);
    }

    #[test]
    fn test_item_by_item() {
        let mut set: PatternSet<&str> = PatternSet::with_itemizer(2, 3, 5, Itemizer::new());
        assert!(set.add_pattern(&to_item_vec(&[1]), 1, "x").is_err());
        assert!(set.add_item("a").is_err());

        set.begin_pattern("first").unwrap();
        assert!(set.begin_pattern("again").is_err());
        set.add_item("b").unwrap();
        set.add_item("a").unwrap();
        set.finish_pattern(4).unwrap();
        assert_eq!(set.items(0), to_item_vec(&[0, 1]).as_slice());
        assert_eq!(set.support(0), 4);

        set.begin_pattern("second").unwrap();
        set.add_item("a").unwrap();
        set.add_item("c").unwrap();
        set.add_item("b").unwrap();
        assert!(set.add_item("d").is_err());
        set.finish_pattern(3).unwrap();
        assert!(set.begin_pattern("third").is_err());
        assert_eq!(set.itemizer().map(|m| m.len()), Some(3));

        assert_eq!(set.reduce(Reduction::Coins1, false, &CancelToken::new()), 1);
        assert_eq!(set.orig(0), Some(&"first"));
        assert_eq!(set.orig(1), None);
    }

    fn arbitrary_patterns() -> impl Strategy<Value = Vec<(Vec<u32>, Support)>> {
        prop::collection::vec(
            (prop::collection::btree_set(0u32..6, 1..5), 1u32..30)
                .prop_map(|(items, support)| (items.into_iter().collect(), support)),
            1..24,
        )
    }

    fn arbitrary_border() -> impl Strategy<Value = Vec<Support>> {
        prop::collection::vec(0u32..12, 3)
    }

    fn build(patterns: &[(Vec<u32>, Support)], border: &[Support]) -> PatternSet<usize> {
        let mut set = PatternSet::new(patterns.len(), 4);
        for (n, (items, support)) in patterns.iter().enumerate() {
            set.add_pattern(&to_item_vec(items), *support, n).unwrap();
        }
        for (offset, &support) in border.iter().enumerate() {
            set.set_border(offset + 2, support);
        }
        set
    }

    proptest! {
        /// Reducing an already reduced set keeps every pattern.
        #[test]
        fn reduction_is_idempotent(
            patterns in arbitrary_patterns(),
            border in arbitrary_border(),
            method in 0u32..10,
        ) {
            let method = Reduction::from_id(method).unwrap();
            let mut set = build(&patterns, &border);
            let kept = set.reduce(method, false, &CancelToken::new());
            let survivors: Vec<(Vec<u32>, Support)> = set
                .kept()
                .map(|(items, support, _)| (items.iter().map(|i| i.id()).collect(), support))
                .collect();
            prop_assert_eq!(survivors.len(), kept);
            let mut again = build(&survivors, &border);
            prop_assert_eq!(again.reduce(method, false, &CancelToken::new()), kept);
        }

        /// After excess coincidence reduction no kept pattern is a proper
        /// subset of another kept pattern.
        #[test]
        fn coins_leave_no_nested_patterns(
            patterns in arbitrary_patterns(),
            border in arbitrary_border(),
        ) {
            let mut set = build(&patterns, &border);
            set.reduce(Reduction::Coins0, false, &CancelToken::new());
            let kept: Vec<Vec<Item>> = set.kept().map(|(items, _, _)| items.to_vec()).collect();
            for a in &kept {
                for b in &kept {
                    prop_assert!(!is_proper_subset(a, b), "{:?} within {:?}", a, b);
                }
            }
        }
    }
}
