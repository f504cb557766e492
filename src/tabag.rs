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

use crate::item::{Item, Support};
use crate::item_counter::ItemCounter;
use crate::itemizer::Itemizer;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Increasing,
    Decreasing,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Increasing => ordering,
            SortOrder::Decreasing => ordering.reverse(),
        }
    }
}

/// Support threshold, either relative to the total transaction weight or
/// an absolute count.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Threshold {
    Percent(f64),
    Absolute(Support),
}

impl Threshold {
    // Negative command line values denote absolute supports.
    pub fn from_arg(value: f64) -> Threshold {
        if value < 0.0 {
            Threshold::Absolute((-value).ceil() as Support)
        } else {
            Threshold::Percent(value)
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            Threshold::Percent(p) => p.is_finite() && p >= 0.0,
            Threshold::Absolute(_) => true,
        }
    }

    // Smallest absolute support meeting the threshold (at least 1).
    pub fn min_count(&self, total_weight: Support) -> Support {
        let s = match *self {
            Threshold::Percent(p) => {
                (p / 100.0 * total_weight as f64 * (1.0 - f64::EPSILON)).ceil() as Support
            }
            Threshold::Absolute(s) => s,
        };
        s.max(1)
    }

    // Largest absolute support still within the threshold.
    pub fn max_count(&self, total_weight: Support) -> Support {
        match *self {
            Threshold::Percent(p) => {
                let s = (p / 100.0 * total_weight as f64 * (1.0 + f64::EPSILON)).floor();
                (s as Support).min(total_weight)
            }
            Threshold::Absolute(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub items: Vec<Item>,
    pub weight: Support,
}

impl Transaction {
    pub fn new(mut items: Vec<Item>, weight: Support) -> Transaction {
        items.sort();
        items.dedup();
        Transaction { items, weight }
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn contains(&self, item: Item) -> bool {
        self.items.binary_search(&item).is_ok()
    }
}

fn cmp_size_items(a: &Transaction, b: &Transaction) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.items.cmp(&b.items))
}

/// Bag (multiset) of weighted transactions over a shared item base.
#[derive(Clone, Debug)]
pub struct TransactionBag {
    itemizer: Arc<Itemizer>,
    transactions: Vec<Transaction>,
    item_count: usize,
    // Column of every item, for bags read from a table.
    columns: Option<Arc<Vec<u32>>>,
}

impl TransactionBag {
    pub fn new(itemizer: Itemizer) -> TransactionBag {
        TransactionBag {
            item_count: itemizer.len(),
            itemizer: Arc::new(itemizer),
            transactions: vec![],
            columns: None,
        }
    }

    #[cfg(test)]
    pub fn from_names(transactions: &[&[&str]]) -> TransactionBag {
        let mut itemizer = Itemizer::new();
        let items: Vec<Vec<Item>> = transactions
            .iter()
            .map(|names| itemizer.to_id_vec(names))
            .collect();
        let mut bag = TransactionBag::new(itemizer);
        for t in items {
            bag.add(t, 1);
        }
        bag
    }

    // Bag sharing this bag's item base and table shape.
    pub fn with_transactions(&self, transactions: Vec<Transaction>) -> TransactionBag {
        TransactionBag {
            itemizer: self.itemizer.clone(),
            transactions,
            item_count: self.item_count,
            columns: self.columns.clone(),
        }
    }

    pub fn add(&mut self, items: Vec<Item>, weight: Support) {
        let transaction = Transaction::new(items, weight);
        if let Some(last) = transaction.items.last() {
            self.item_count = self.item_count.max(last.as_index() + 1);
        }
        self.transactions.push(transaction);
    }

    pub fn set_columns(&mut self, columns: Vec<u32>) {
        self.columns = Some(Arc::new(columns));
    }

    pub fn is_tabular(&self) -> bool {
        self.columns.is_some()
    }

    pub fn column_of(&self, item: Item) -> Option<u32> {
        self.columns
            .as_ref()
            .and_then(|columns| columns.get(item.as_index()).cloned())
    }

    pub fn column_count(&self) -> usize {
        match self.columns {
            Some(ref columns) => columns.iter().map(|&c| c as usize + 1).max().unwrap_or(0),
            None => 0,
        }
    }

    pub fn itemizer(&self) -> &Itemizer {
        &self.itemizer
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn count(&self) -> usize {
        self.transactions.len()
    }

    pub fn total_weight(&self) -> Support {
        self.transactions.iter().map(|t| t.weight).sum()
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn max_size(&self) -> usize {
        self.transactions.iter().map(|t| t.len()).max().unwrap_or(0)
    }

    // Total weight of all item instances.
    pub fn extent(&self) -> u64 {
        self.transactions
            .iter()
            .map(|t| t.len() as u64 * t.weight as u64)
            .sum()
    }

    pub fn item_frequencies(&self) -> ItemCounter {
        let mut counter = ItemCounter::with_len(self.item_count);
        for t in &self.transactions {
            for item in &t.items {
                counter.add(item, t.weight);
            }
        }
        counter
    }

    // Drops items with a frequency below min_support and renumbers the
    // remaining ones by frequency. Returns the number of remaining items.
    pub fn recode(&mut self, min_support: Support, order: SortOrder) -> usize {
        let frequencies = self.item_frequencies();
        let mut kept: Vec<Item> = frequencies.items_with_count_at_least(min_support.max(1));
        kept.sort_by(|a, b| {
            order.apply(frequencies.get(a).cmp(&frequencies.get(b)).then(a.cmp(b)))
        });

        let mut map: Vec<Option<Item>> = vec![None; self.item_count];
        for (new_id, item) in kept.iter().enumerate() {
            map[item.as_index()] = Some(Item::with_id(new_id as u32));
        }
        for t in self.transactions.iter_mut() {
            let mut items: Vec<Item> = t.items.iter().filter_map(|i| map[i.as_index()]).collect();
            items.sort();
            t.items = items;
        }

        self.columns = match self.columns.take() {
            // A table loses its shape when any value is dropped.
            Some(ref columns) if kept.len() == self.item_count => {
                let mut recoded = vec![0; kept.len()];
                for (old, new) in map.iter().enumerate() {
                    if let Some(new) = new {
                        recoded[new.as_index()] = columns[old];
                    }
                }
                Some(Arc::new(recoded))
            }
            _ => None,
        };
        if self.itemizer.len() == map.len() {
            Arc::make_mut(&mut self.itemizer).recode(&map);
        }
        self.item_count = kept.len();
        kept.len()
    }

    // Drops empty transactions and those shorter than min_size.
    pub fn drop_shorter_than(&mut self, min_size: usize) {
        self.transactions.retain(|t| t.len() >= min_size.max(1));
    }

    // Orders transactions by size, ties by items.
    pub fn sort_by_size(&mut self, order: SortOrder) {
        self.transactions
            .sort_by(|a, b| order.apply(cmp_size_items(a, b)));
    }

    // Merges identical transactions, summing their weights. Leaves the bag
    // sorted by increasing size.
    pub fn reduce(&mut self) -> usize {
        self.sort_by_size(SortOrder::Increasing);
        let mut reduced: Vec<Transaction> = Vec::with_capacity(self.transactions.len());
        for t in self.transactions.drain(..) {
            match reduced.last_mut() {
                Some(last) if last.items == t.items => last.weight += t.weight,
                _ => reduced.push(t),
            }
        }
        self.transactions = reduced;
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::to_item_vec;

    #[test]
    fn test_threshold() {
        assert_eq!(Threshold::from_arg(-3.0), Threshold::Absolute(3));
        assert_eq!(Threshold::from_arg(10.0), Threshold::Percent(10.0));
        assert_eq!(Threshold::Percent(50.0).min_count(5), 3);
        assert_eq!(Threshold::Percent(40.0).min_count(5), 2);
        assert_eq!(Threshold::Percent(0.0).min_count(5), 1);
        assert_eq!(Threshold::Percent(100.0).max_count(5), 5);
        assert_eq!(Threshold::Percent(50.0).max_count(5), 2);
        assert_eq!(Threshold::Absolute(7).min_count(5), 7);
        assert!(!Threshold::Percent(-1.0).is_valid());
    }

    #[test]
    fn test_recode_filter_reduce() {
        let mut bag = TransactionBag::from_names(&[
            &["a", "b", "c"],
            &["a", "b"],
            &["b", "c", "d"],
            &["a", "b"],
            &["b"],
        ]);
        assert_eq!(bag.count(), 5);
        assert_eq!(bag.item_count(), 4);
        assert_eq!(bag.total_weight(), 5);

        // b:5 a:3 c:2 d:1
        let m = bag.recode(2, SortOrder::Decreasing);
        assert_eq!(m, 3);
        assert_eq!(bag.itemizer().str_of(Item::with_id(0)), "b");
        assert_eq!(bag.itemizer().str_of(Item::with_id(1)), "a");
        assert_eq!(bag.itemizer().str_of(Item::with_id(2)), "c");
        let frequencies = bag.item_frequencies();
        assert_eq!(frequencies.as_slice(), &[5, 3, 2]);

        bag.drop_shorter_than(2);
        assert_eq!(bag.count(), 4);

        assert_eq!(bag.reduce(), 3);
        assert_eq!(bag.total_weight(), 4);
        let merged = bag
            .transactions()
            .iter()
            .find(|t| t.items == to_item_vec(&[0, 1]))
            .map(|t| t.weight);
        assert_eq!(merged, Some(2));
        assert_eq!(bag.transactions()[0].items, to_item_vec(&[0, 1]));

        bag.sort_by_size(SortOrder::Decreasing);
        assert_eq!(bag.transactions()[0].len(), 3);
        assert_eq!(bag.transactions()[2].items, to_item_vec(&[0, 1]));
    }

    #[test]
    fn test_recode_keeps_table_shape() {
        let mut bag = TransactionBag::from_names(&[&["0=x", "1=y"], &["0=z", "1=y"]]);
        bag.set_columns(vec![0, 1, 0]);
        assert!(bag.is_tabular());
        assert_eq!(bag.column_count(), 2);
        bag.recode(1, SortOrder::Decreasing);
        assert!(bag.is_tabular());
        // "1=y" is the most frequent item.
        assert_eq!(bag.column_of(Item::with_id(0)), Some(1));
        bag.recode(2, SortOrder::Decreasing);
        assert!(!bag.is_tabular());
    }
}
