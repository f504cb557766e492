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

//! Item set repository with one item per node.

use crate::error::MineResult;
use crate::isect_tree::SetStore;
use crate::item::{Item, Support};
use std::cmp;

const ROOT: usize = 0;

#[derive(Debug)]
struct PrefixNode {
    item: Item,
    support: Support,
    // Whether the path from the root to this node is a stored set.
    stored: bool,
    // Sorted by item.
    children: Vec<usize>,
}

impl PrefixNode {
    fn new(item: Item) -> PrefixNode {
        PrefixNode {
            item,
            support: 0,
            stored: false,
            children: vec![],
        }
    }
}

#[derive(Debug)]
pub struct PrefixTree {
    nodes: Vec<PrefixNode>,
    free: Vec<usize>,
}

impl Default for PrefixTree {
    fn default() -> Self {
        PrefixTree::new()
    }
}

impl PrefixTree {
    pub fn new() -> PrefixTree {
        PrefixTree {
            nodes: vec![PrefixNode::new(Item::null())],
            free: vec![],
        }
    }

    fn alloc(&mut self, item: Item) -> MineResult<usize> {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = PrefixNode::new(item);
            return Ok(id);
        }
        self.nodes.try_reserve(1)?;
        self.nodes.push(PrefixNode::new(item));
        Ok(self.nodes.len() - 1)
    }

    fn release(&mut self, id: usize) {
        self.nodes[id].children = vec![];
        self.nodes[id].stored = false;
        self.free.push(id);
    }

    fn find_child(&self, id: usize, item: Item) -> Result<usize, usize> {
        self.nodes[id]
            .children
            .binary_search_by(|&child| self.nodes[child].item.cmp(&item))
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
            let marked = marks.get(node.item.as_index()).cloned().unwrap_or(false);
            if marked {
                isect.push(node.item);
            }
            if node.stored {
                visit(isect, node.support);
            }
            self.scan_node(child, marks, isect, visit);
            if marked {
                isect.pop();
            }
        }
    }

    // Returns whether the node is still needed.
    fn retain_node(
        &mut self,
        id: usize,
        path: &mut Vec<Item>,
        keep: &mut dyn FnMut(&[Item], Support) -> bool,
    ) -> bool {
        if id != ROOT {
            path.push(self.nodes[id].item);
        }
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
        if id != ROOT {
            path.pop();
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
        for &child in &self.nodes[id].children {
            let node = &self.nodes[child];
            let mut matched = matched;
            if matched < items.len() {
                match node.item.cmp(&items[matched]) {
                    cmp::Ordering::Equal => matched += 1,
                    // Children are sorted, and later items cannot bring
                    // back the missing one.
                    cmp::Ordering::Greater => break,
                    cmp::Ordering::Less => {}
                }
            }
            if matched == items.len()
                && depth + 1 > items.len()
                && node.stored
                && node.support >= min_support
            {
                return true;
            }
            if self.superset_below(child, items, matched, depth + 1, min_support) {
                return true;
            }
        }
        false
    }

    fn visit_node(&self, id: usize, path: &mut Vec<Item>, visit: &mut dyn FnMut(&[Item], Support)) {
        for &child in &self.nodes[id].children {
            path.push(self.nodes[child].item);
            if self.nodes[child].stored {
                visit(path, self.nodes[child].support);
            }
            self.visit_node(child, path, visit);
            path.pop();
        }
    }
}

impl SetStore for PrefixTree {
    fn store(&mut self, items: &[Item], support: Support) -> MineResult<()> {
        let mut id = ROOT;
        for &item in items {
            id = match self.find_child(id, item) {
                Ok(slot) => self.nodes[id].children[slot],
                Err(slot) => {
                    let child = self.alloc(item)?;
                    self.nodes[id].children.insert(slot, child);
                    child
                }
            };
        }
        if id != ROOT {
            let node = &mut self.nodes[id];
            node.support = if node.stored {
                node.support.max(support)
            } else {
                support
            };
            node.stored = true;
        }
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
