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

//! Path compressed item set repository. Every node holds a run of items;
//! nodes are split when a stored set ends or branches inside a run, and
//! merged back when pruning leaves an unstored node with a single child.

use crate::error::MineResult;
use crate::isect_tree::SetStore;
use crate::item::{Item, Support};
use std::cmp;

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct PatriciaNode {
    label: Vec<Item>,
    support: Support,
    stored: bool,
    // Sorted by the first item of their labels.
    children: Vec<usize>,
}

#[derive(Debug)]
pub struct PatriciaTree {
    nodes: Vec<PatriciaNode>,
    free: Vec<usize>,
}

impl Default for PatriciaTree {
    fn default() -> Self {
        PatriciaTree::new()
    }
}

fn common_prefix_len(a: &[Item], b: &[Item]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

impl PatriciaTree {
    pub fn new() -> PatriciaTree {
        PatriciaTree {
            nodes: vec![PatriciaNode::default()],
            free: vec![],
        }
    }

    fn alloc(&mut self, label: Vec<Item>) -> MineResult<usize> {
        let node = PatriciaNode {
            label,
            ..PatriciaNode::default()
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            return Ok(id);
        }
        self.nodes.try_reserve(1)?;
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    fn release(&mut self, id: usize) {
        self.nodes[id] = PatriciaNode::default();
        self.free.push(id);
    }

    fn find_child(&self, id: usize, item: Item) -> Result<usize, usize> {
        self.nodes[id]
            .children
            .binary_search_by(|&child| self.nodes[child].label[0].cmp(&item))
    }

    fn scan_node(
        &self,
        id: usize,
        marks: &[bool],
        isect: &mut Vec<Item>,
        visit: &mut dyn FnMut(&[Item], Support),
    ) {
        for &child in &self.nodes[id].children {
            let node = &self.nodes[child];
            let len = isect.len();
            isect.extend(
                node.label
                    .iter()
                    .filter(|item| marks.get(item.as_index()).cloned().unwrap_or(false)),
            );
            if node.stored {
                visit(isect, node.support);
            }
            self.scan_node(child, marks, isect, visit);
            isect.truncate(len);
        }
    }

    fn retain_node(
        &mut self,
        id: usize,
        path: &mut Vec<Item>,
        keep: &mut dyn FnMut(&[Item], Support) -> bool,
    ) -> bool {
        let len = path.len();
        path.extend_from_slice(&self.nodes[id].label);
        if self.nodes[id].stored && !keep(path, self.nodes[id].support) {
            self.nodes[id].stored = false;
        }
        let mut children = std::mem::take(&mut self.nodes[id].children);
        children.retain(|&child| {
            let alive = self.retain_node(child, path, keep);
            if !alive {
                self.release(child);
            }
            alive
        });
        self.nodes[id].children = children;
        path.truncate(len);

        if id != ROOT && !self.nodes[id].stored && self.nodes[id].children.len() == 1 {
            let child = self.nodes[id].children[0];
            let merged = std::mem::take(&mut self.nodes[child]);
            let node = &mut self.nodes[id];
            node.label.extend(merged.label);
            node.support = merged.support;
            node.stored = merged.stored;
            node.children = merged.children;
            self.release(child);
        }
        self.nodes[id].stored || !self.nodes[id].children.is_empty()
    }

    fn superset_below(
        &self,
        id: usize,
        items: &[Item],
        matched: usize,
        depth: usize,
        min_support: Support,
    ) -> bool {
        'children: for &child in &self.nodes[id].children {
            let node = &self.nodes[child];
            let mut matched = matched;
            for &item in &node.label {
                if matched == items.len() {
                    break;
                }
                match item.cmp(&items[matched]) {
                    cmp::Ordering::Equal => matched += 1,
                    cmp::Ordering::Greater => continue 'children,
                    cmp::Ordering::Less => {}
                }
            }
            let depth = depth + node.label.len();
            if matched == items.len()
                && depth > items.len()
                && node.stored
                && node.support >= min_support
            {
                return true;
            }
            if self.superset_below(child, items, matched, depth, min_support) {
                return true;
            }
        }
        false
    }

    fn visit_node(&self, id: usize, path: &mut Vec<Item>, visit: &mut dyn FnMut(&[Item], Support)) {
        for &child in &self.nodes[id].children {
            let len = path.len();
            path.extend_from_slice(&self.nodes[child].label);
            if self.nodes[child].stored {
                visit(path, self.nodes[child].support);
            }
            self.visit_node(child, path, visit);
            path.truncate(len);
        }
    }
}

impl SetStore for PatriciaTree {
    fn store(&mut self, items: &[Item], support: Support) -> MineResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut id = ROOT;
        let mut pos = 0;
        while pos < items.len() {
            let slot = match self.find_child(id, items[pos]) {
                Ok(slot) => slot,
                Err(slot) => {
                    let leaf = self.alloc(items[pos..].to_vec())?;
                    self.nodes[id].children.insert(slot, leaf);
                    id = leaf;
                    break;
                }
            };
            let child = self.nodes[id].children[slot];
            let common = common_prefix_len(&self.nodes[child].label, &items[pos..]);
            if common < self.nodes[child].label.len() {
                // Split the child's run at the first difference.
                let split = self.alloc(vec![])?;
                let tail = self.nodes[child].label.split_off(common);
                let head = std::mem::replace(&mut self.nodes[child].label, tail);
                self.nodes[split].label = head;
                self.nodes[split].children.push(child);
                self.nodes[id].children[slot] = split;
                id = split;
            } else {
                id = child;
            }
            pos += common;
        }
        let node = &mut self.nodes[id];
        node.support = if node.stored {
            node.support.max(support)
        } else {
            support
        };
        node.stored = true;
        Ok(())
    }

    fn scan(&self, marks: &[bool], visit: &mut dyn FnMut(&[Item], Support)) {
        let mut isect = vec![];
        self.scan_node(ROOT, marks, &mut isect, visit);
    }

    fn for_each(&self, visit: &mut dyn FnMut(&[Item], Support)) {
        let mut path = vec![];
        self.visit_node(ROOT, &mut path, visit);
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&[Item], Support) -> bool) {
        let mut path = vec![];
        self.retain_node(ROOT, &mut path, keep);
    }

    fn has_superset(&self, items: &[Item], min_support: Support) -> bool {
        self.superset_below(ROOT, items, 0, 0, min_support)
    }

    fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::PatriciaTree;
    use crate::isect_tree::SetStore;
    use crate::item::{to_item_vec, Item, Support};

    fn contents(tree: &PatriciaTree) -> Vec<(Vec<Item>, Support)> {
        let mut sets = vec![];
        tree.for_each(&mut |items, support| sets.push((items.to_vec(), support)));
        sets
    }

    #[test]
    fn test_split_on_store() {
        let mut tree = PatriciaTree::new();
        tree.store(&to_item_vec(&[1, 2, 3, 4]), 2).unwrap();
        assert_eq!(tree.node_count(), 1);

        // Ends inside the run.
        tree.store(&to_item_vec(&[1, 2]), 3).unwrap();
        assert_eq!(tree.node_count(), 2);

        // Branches inside the run.
        tree.store(&to_item_vec(&[1, 2, 5]), 4).unwrap();
        assert_eq!(tree.node_count(), 3);
        tree.store(&to_item_vec(&[1, 3]), 1).unwrap();
        assert_eq!(tree.node_count(), 5);

        assert_eq!(
            contents(&tree),
            vec![
                (to_item_vec(&[1, 2]), 3),
                (to_item_vec(&[1, 2, 3, 4]), 2),
                (to_item_vec(&[1, 2, 5]), 4),
                (to_item_vec(&[1, 3]), 1),
            ]
        );
    }

    #[test]
    fn test_merge_on_retain() {
        let mut tree = PatriciaTree::new();
        tree.store(&to_item_vec(&[1, 2, 3, 4]), 2).unwrap();
        tree.store(&to_item_vec(&[1, 2]), 3).unwrap();
        tree.store(&to_item_vec(&[1, 2, 5]), 1).unwrap();
        assert_eq!(tree.node_count(), 3);

        // Dropping {1,2,5} leaves {1,2} -> {3,4}; dropping {1,2} then
        // merges the chain back into one run.
        tree.retain(&mut |_, support| support >= 2);
        assert_eq!(tree.node_count(), 2);
        tree.retain(&mut |items, _| items.len() > 2);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(contents(&tree), vec![(to_item_vec(&[1, 2, 3, 4]), 2)]);
        assert_eq!(tree.nodes[tree.nodes[0].children[0]].label.len(), 4);
    }

    #[test]
    fn test_scan_and_superset() {
        let mut tree = PatriciaTree::new();
        tree.store(&to_item_vec(&[1, 2, 3]), 3).unwrap();
        tree.store(&to_item_vec(&[1, 2]), 5).unwrap();
        tree.store(&to_item_vec(&[2, 4]), 2).unwrap();

        let mut marks = vec![false; 5];
        marks[1] = true;
        marks[3] = true;
        let mut seen = vec![];
        tree.scan(&marks, &mut |isect, support| seen.push((isect.to_vec(), support)));
        assert_eq!(
            seen,
            vec![
                (to_item_vec(&[1]), 5),
                (to_item_vec(&[1, 3]), 3),
                (to_item_vec(&[]), 2),
            ]
        );

        assert!(tree.has_superset(&to_item_vec(&[1, 2]), 3));
        assert!(!tree.has_superset(&to_item_vec(&[1, 2]), 4));
        assert!(tree.has_superset(&to_item_vec(&[3]), 1));
        assert!(tree.has_superset(&to_item_vec(&[4]), 2));
        assert!(!tree.has_superset(&to_item_vec(&[1, 2, 3]), 1));
    }
}
