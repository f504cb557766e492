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

//! Surrogate data sets: randomized copies of a transaction bag that keep
//! some of its statistics.

use crate::error::{MineError, MineResult};
use crate::item::Item;
use crate::tabag::{Transaction, TransactionBag};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Surrogate {
    // Plain copy of the data.
    Identity,
    // Every transaction's items redrawn by item frequency; transaction
    // sizes and weights are kept.
    Random,
    // Item swaps between random transaction pairs; transaction sizes and
    // item frequencies are kept.
    Swap,
    // Values permuted within each column of table-derived data.
    Shuffle,
}

impl Surrogate {
    pub fn from_char(c: char) -> MineResult<Surrogate> {
        match c {
            'i' | 'x' => Ok(Surrogate::Identity),
            'r' => Ok(Surrogate::Random),
            'p' => Ok(Surrogate::Swap),
            's' => Ok(Surrogate::Shuffle),
            _ => Err(MineError::invalid(format!("invalid surrogate method '{}'", c))),
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        bag: &TransactionBag,
        rng: &mut R,
    ) -> MineResult<TransactionBag> {
        match self {
            Surrogate::Identity => Ok(bag.clone()),
            Surrogate::Random => random(bag, rng),
            Surrogate::Swap => swap(bag, rng),
            Surrogate::Shuffle => shuffle(bag, rng),
        }
    }
}

fn copy_transactions(bag: &TransactionBag) -> MineResult<Vec<Transaction>> {
    let mut transactions = Vec::new();
    transactions.try_reserve(bag.count())?;
    transactions.extend(bag.transactions().iter().cloned());
    Ok(transactions)
}

// Draws count distinct items with probabilities proportional to weights by
// giving every item the key u^(1/w) and keeping the largest keys.
fn weighted_sample_by_keys<R: Rng + ?Sized>(
    weights: &[f64],
    count: usize,
    rng: &mut R,
    out: &mut Vec<Item>,
) {
    let mut keys: Vec<(f64, usize)> = weights
        .iter()
        .enumerate()
        .filter(|(_, &w)| w > 0.0)
        .map(|(i, &w)| (rng.gen::<f64>().powf(1.0 / w), i))
        .collect();
    keys.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    out.extend(keys.iter().take(count).map(|&(_, i)| Item::with_id(i as u32)));
}

fn random<R: Rng + ?Sized>(bag: &TransactionBag, rng: &mut R) -> MineResult<TransactionBag> {
    let frequencies = bag.item_frequencies();
    let weights: Vec<f64> = frequencies.as_slice().iter().map(|&f| f as f64).collect();
    let available = weights.iter().filter(|&&w| w > 0.0).count();
    if available == 0 {
        return Ok(bag.clone());
    }
    let distribution = WeightedIndex::new(&weights)
        .map_err(|err| MineError::MiningFailure(format!("item distribution: {}", err)))?;

    let mut transactions = Vec::new();
    transactions.try_reserve(bag.count())?;
    let mut items: Vec<Item> = vec![];
    for t in bag.transactions() {
        let size = t.len().min(available);
        items.clear();
        if size * 2 > available {
            weighted_sample_by_keys(&weights, size, rng, &mut items);
        } else {
            while items.len() < size {
                let item = Item::with_id(distribution.sample(rng) as u32);
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        transactions.push(Transaction::new(items.clone(), t.weight));
    }
    Ok(bag.with_transactions(transactions))
}

fn replace_item(items: &mut Vec<Item>, index: usize, item: Item) {
    items.remove(index);
    let position = match items.binary_search(&item) {
        Ok(position) | Err(position) => position,
    };
    items.insert(position, item);
}

fn swap<R: Rng + ?Sized>(bag: &TransactionBag, rng: &mut R) -> MineResult<TransactionBag> {
    let mut transactions = copy_transactions(bag)?;
    let n = transactions.len();
    if n < 2 {
        return Ok(bag.with_transactions(transactions));
    }
    let swaps: usize = transactions.iter().map(|t| t.len()).sum();
    for _ in 0..swaps {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a == b || transactions[a].is_empty() || transactions[b].is_empty() {
            continue;
        }
        let ia = rng.gen_range(0..transactions[a].len());
        let ib = rng.gen_range(0..transactions[b].len());
        let x = transactions[a].items[ia];
        let y = transactions[b].items[ib];
        if x == y || transactions[a].contains(y) || transactions[b].contains(x) {
            continue;
        }
        replace_item(&mut transactions[a].items, ia, y);
        replace_item(&mut transactions[b].items, ib, x);
    }
    Ok(bag.with_transactions(transactions))
}

fn shuffle<R: Rng + ?Sized>(bag: &TransactionBag, rng: &mut R) -> MineResult<TransactionBag> {
    if !bag.is_tabular() {
        return Err(MineError::NotTabular);
    }
    let width = bag.column_count();
    let height = bag.count();
    // cells[column][row]
    let mut cells: Vec<Vec<Item>> = vec![Vec::with_capacity(height); width];
    for t in bag.transactions() {
        if t.len() != width {
            return Err(MineError::NotTabular);
        }
        for &item in &t.items {
            let column = bag.column_of(item).ok_or(MineError::NotTabular)? as usize;
            cells[column].push(item);
        }
    }
    // A row with two values of one column lacks a value of another.
    if cells.iter().any(|column| column.len() != height) {
        return Err(MineError::NotTabular);
    }
    for column in cells.iter_mut() {
        column.shuffle(rng);
    }

    let mut transactions = Vec::new();
    transactions.try_reserve(height)?;
    for (row, t) in bag.transactions().iter().enumerate() {
        let items: Vec<Item> = cells.iter().map(|column| column[row]).collect();
        transactions.push(Transaction::new(items, t.weight));
    }
    Ok(bag.with_transactions(transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction_reader::read_transactions;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn sample_bag() -> TransactionBag {
        TransactionBag::from_names(&[
            &["a", "b", "c"],
            &["a", "d"],
            &["b", "c", "e", "f"],
            &["a", "b"],
            &["c", "d", "e"],
            &["f"],
        ])
    }

    fn sizes(bag: &TransactionBag) -> Vec<usize> {
        bag.transactions().iter().map(|t| t.len()).collect()
    }

    fn assert_sorted_sets(bag: &TransactionBag) {
        for t in bag.transactions() {
            assert!(t.items.windows(2).all(|w| w[0] < w[1]), "{:?}", t.items);
        }
    }

    #[test]
    fn test_swap_keeps_sizes_and_frequencies() {
        let bag = sample_bag();
        let mut rng = StdRng::seed_from_u64(7);
        let surrogate = Surrogate::Swap.generate(&bag, &mut rng).unwrap();
        assert_eq!(sizes(&surrogate), sizes(&bag));
        assert_eq!(surrogate.item_frequencies(), bag.item_frequencies());
        assert_sorted_sets(&surrogate);
    }

    #[test]
    fn test_random_keeps_sizes() {
        let bag = sample_bag();
        let mut rng = StdRng::seed_from_u64(3);
        let surrogate = Surrogate::Random.generate(&bag, &mut rng).unwrap();
        assert_eq!(sizes(&surrogate), sizes(&bag));
        assert_eq!(surrogate.total_weight(), bag.total_weight());
        assert_sorted_sets(&surrogate);
    }

    #[test]
    fn test_same_seed_same_surrogate() {
        let bag = sample_bag();
        for &method in &[Surrogate::Random, Surrogate::Swap] {
            let a = method.generate(&bag, &mut StdRng::seed_from_u64(11)).unwrap();
            let b = method.generate(&bag, &mut StdRng::seed_from_u64(11)).unwrap();
            assert_eq!(a.transactions(), b.transactions());
        }
    }

    #[test]
    fn test_identity() {
        let bag = sample_bag();
        let copy = Surrogate::Identity
            .generate(&bag, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(copy.transactions(), bag.transactions());
    }

    #[test]
    fn test_shuffle() {
        let bag = read_transactions(Cursor::new("x 1 p\ny 2 p\nz 1 q\nx 3 q\n"), true).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let surrogate = Surrogate::Shuffle.generate(&bag, &mut rng).unwrap();
        assert_eq!(surrogate.count(), 4);
        assert_eq!(surrogate.item_frequencies(), bag.item_frequencies());
        for t in surrogate.transactions() {
            let mut columns: Vec<u32> = t
                .items
                .iter()
                .map(|&i| surrogate.column_of(i).unwrap())
                .collect();
            columns.sort();
            assert_eq!(columns, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_shuffle_requires_table() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            Surrogate::Shuffle.generate(&sample_bag(), &mut rng),
            Err(MineError::NotTabular)
        ));
    }
}
