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

/// Weighted per-item frequencies, indexed densely by item id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemCounter {
    counter: Vec<Support>,
}

impl ItemCounter {
    pub fn new() -> ItemCounter {
        ItemCounter { counter: vec![] }
    }
    pub fn with_len(len: usize) -> ItemCounter {
        ItemCounter {
            counter: vec![0; len],
        }
    }
    pub fn add(&mut self, item: &Item, count: Support) {
        let index = item.as_index();
        if self.counter.len() <= index {
            self.counter.resize(index + 1, 0);
        }
        self.counter[index] += count;
    }
    // Decrements and returns the remaining count.
    pub fn sub(&mut self, item: &Item, count: Support) -> Support {
        let index = item.as_index();
        self.counter[index] = self.counter[index].saturating_sub(count);
        self.counter[index]
    }
    pub fn get(&self, item: &Item) -> Support {
        let index = item.as_index();
        if index >= self.counter.len() {
            0
        } else {
            self.counter[index]
        }
    }
    pub fn as_slice(&self) -> &[Support] {
        &self.counter
    }
    // Largest count among the given items, 0 for an empty set.
    pub fn max_of(&self, items: &[Item]) -> Support {
        items.iter().map(|item| self.get(item)).max().unwrap_or(0)
    }
    pub fn items_with_count_at_least(&self, min_count: Support) -> Vec<Item> {
        let mut v: Vec<Item> = vec![];
        for i in 0..self.counter.len() {
            if self.counter[i] >= min_count && self.counter[i] > 0 {
                v.push(Item::with_id(i as u32));
            }
        }
        v
    }
    pub fn sort_descending(&self, v: &mut Vec<Item>) {
        v.sort_by(|a, b| {
            let count_a = self.get(a);
            let count_b = self.get(b);
            if count_a == count_b {
                return b.cmp(a);
            }
            count_b.cmp(&count_a)
        });
    }
}
