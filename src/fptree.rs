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

use crate::cancel::CancelToken;
use crate::error::MineResult;
use crate::item::{Item, Support, SUPPORT_MAX};
use crate::item_counter::ItemCounter;
use crate::report::{Reporter, Target};
use crate::tabag::TransactionBag;
use itertools::Itertools;
use rayon::prelude::*;
use std::cmp;
use std::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct FPNode {
    item: Item,
    count: Support,
    children: Vec<usize>,
    parent: usize,
}

pub struct FPTree {
    nodes: Vec<Vec<FPNode>>,
    item_count: ItemCounter,
    next_node_id: usize,
    item_lists: Vec<Vec<usize>>,
}

impl FPNode {
    fn new(item: Item, parent: usize) -> FPNode {
        FPNode {
            item,
            count: 0,
            children: Vec::with_capacity(1),
            parent,
        }
    }

    fn is_root(&self) -> bool {
        self.item.is_null()
    }
}

const FPTREE_SPLAY: usize = 32;

impl Default for FPTree {
    fn default() -> Self {
        FPTree::new()
    }
}

impl FPTree {
    pub fn new() -> FPTree {
        let mut tree = FPTree {
            nodes: vec![],
            item_count: ItemCounter::new(),
            next_node_id: 0,
            item_lists: Vec::new(),
        };
        // Add root.
        tree.add_node(0, Item::null());
        tree
    }

    fn add_node(&mut self, parent: usize, item: Item) -> usize {
        let id = self.next_node_id;
        self.next_node_id += 1;
        let (cohort, element) = self.sub_indicies_of(id);
        if self.nodes.len() <= cohort {
            self.nodes.push(Vec::with_capacity(FPTREE_SPLAY));
        }
        debug_assert_eq!(element, self.nodes[cohort].len());
        self.nodes[cohort].push(FPNode::new(item, parent));
        if id != parent {
            self.get_node_mut(parent).children.push(id);
        }
        self.add_to_item_list(item, id);
        id
    }

    fn add_to_item_list(&mut self, item: Item, id: usize) {
        if item.is_null() {
            return;
        }
        let index = item.as_index();
        if index >= self.item_lists.len() {
            self.item_lists.resize(index + 1, vec![]);
        }
        self.item_lists[index].push(id);
    }

    fn sub_indicies_of(&self, id: usize) -> (usize, usize) {
        (id / FPTREE_SPLAY, id % FPTREE_SPLAY)
    }

    fn get_node_mut(&mut self, id: usize) -> &mut FPNode {
        let (cohort, index) = self.sub_indicies_of(id);
        &mut self.nodes[cohort][index]
    }

    fn get_node(&self, id: usize) -> &FPNode {
        let (cohort, index) = self.sub_indicies_of(id);
        &self.nodes[cohort][index]
    }

    fn child_of(&self, id: usize, item: Item) -> Option<usize> {
        self.get_node(id)
            .children
            .iter()
            .cloned()
            .find(|&child| self.get_node(child).item == item)
    }

    fn insert_child(&mut self, id: usize, item: Item, count: Support) -> usize {
        let child_id = match self.child_of(id, item) {
            Some(child_id) => child_id,
            None => self.add_node(id, item),
        };
        self.get_node_mut(child_id).count += count;
        child_id
    }

    // Items must be in tree order, i.e. by decreasing frequency.
    pub fn insert(&mut self, transaction: &[Item], count: Support) {
        // Start iterating at the root node.
        let mut id = 0;
        for &item in transaction {
            // Keep a count of item frequencies of what's in the
            // tree to make sorting later easier.
            self.item_count.add(&item, count);
            // Add the item to the tree as a child of the previous node.
            id = self.insert_child(id, item, count);
        }
    }

    pub fn node_count(&self) -> usize {
        self.next_node_id
    }

    fn item_count(&self) -> &ItemCounter {
        &self.item_count
    }

    fn construct_conditional_tree(&self, item: Item) -> FPTree {
        let mut conditional_tree = FPTree::new();
        let item_list = match self.item_lists.get(item.as_index()) {
            Some(list) => list,
            None => return conditional_tree,
        };
        for &node_id in item_list {
            conditional_tree.insert(
                &self.path_from_root_to_excluding(node_id),
                self.get_node(node_id).count,
            );
        }
        conditional_tree
    }

    fn path_from_root_to_excluding(&self, node_id: usize) -> Vec<Item> {
        let mut path = vec![];
        let mut id = self.get_node(node_id).parent;
        loop {
            let node = self.get_node(id);
            if node.is_root() {
                break;
            }
            path.push(node.item);
            id = node.parent;
        }
        path.reverse();
        path
    }
}

#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct ItemSet {
    pub items: Vec<Item>,
    pub support: Support,
}

// Item sets order by size, then lexicographically by items.
impl Ord for ItemSet {
    fn cmp(&self, other: &ItemSet) -> cmp::Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.items.cmp(&other.items))
            .then_with(|| self.support.cmp(&other.support))
    }
}

impl PartialOrd for ItemSet {
    fn partial_cmp(&self, other: &ItemSet) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl ItemSet {
    pub fn new(items: Vec<Item>, support: Support) -> ItemSet {
        ItemSet {
            items: items.into_iter().sorted().collect(),
            support,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

// Recursively mines all item sets extending path with at least min_count
// support and at most max_size items.
pub fn fp_growth(
    fptree: &FPTree,
    min_count: Support,
    path: &[Item],
    path_count: Support,
    max_size: usize,
    cancel: &CancelToken,
) -> Vec<ItemSet> {
    if path.len() >= max_size || cancel.is_cancelled() {
        return vec![];
    }

    // Get list of items in the tree which are above the minimum support
    // threshold.
    let items: Vec<Item> = fptree.item_count().items_with_count_at_least(min_count);

    items
        .par_iter()
        .flat_map(|item| -> Vec<ItemSet> {
            // The path to here plus this item must be above the minimum
            // support threshold.
            let mut itemset: Vec<Item> = Vec::from(path);
            let new_path_count = cmp::min(path_count, fptree.item_count().get(item));
            itemset.push(*item);

            let conditional_tree = fptree.construct_conditional_tree(*item);
            let mut result = fp_growth(
                &conditional_tree,
                min_count,
                &itemset,
                new_path_count,
                max_size,
                cancel,
            );

            result.push(ItemSet::new(itemset, new_path_count));
            result
        })
        .collect::<Vec<ItemSet>>()
}

// Builds the FP-tree of a bag, inserting every transaction with its items
// ordered by decreasing frequency. Infrequent items are left out.
pub fn build_fptree(bag: &TransactionBag, min_support: Support) -> FPTree {
    let frequencies = bag.item_frequencies();
    let mut fptree = FPTree::new();
    let mut transaction: Vec<Item> = vec![];
    for t in bag.transactions() {
        transaction.clear();
        transaction.extend(
            t.items
                .iter()
                .cloned()
                .filter(|item| frequencies.get(item) >= min_support),
        );
        frequencies.sort_descending(&mut transaction);
        fptree.insert(&transaction, t.weight);
    }
    fptree
}

// Mines the bag with FP-growth and hands the sets matching the reporter's
// target to the reporter. Returns the number of reported sets.
pub fn mine_fp_growth(
    bag: &TransactionBag,
    min_support: Support,
    reporter: &mut Reporter,
    cancel: &CancelToken,
) -> MineResult<usize> {
    let min_support = min_support.max(1);
    let (_, max_size) = reporter.size_range();
    // Closed, maximal and generator checks look one item beyond the size
    // limit.
    let max_size = match reporter.target() {
        Target::Frequent => max_size,
        _ => max_size.saturating_add(1),
    };

    let timer = Instant::now();
    let fptree = build_fptree(bag, min_support);
    let mut itemsets = fp_growth(&fptree, min_support, &[], SUPPORT_MAX, max_size, cancel);
    cancel.check()?;
    itemsets.sort();
    debug!(
        "FPGrowth found {} frequent itemsets in {} nodes in {} ms.",
        itemsets.len(),
        fptree.node_count(),
        timer.elapsed().as_millis()
    );
    reporter.report_frequent(&itemsets)
}
