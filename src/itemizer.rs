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

use crate::item::Item;
use fnv::FnvHashMap;

/// Maps item names to dense identifiers `0..len()`.
#[derive(Clone, Debug, Default)]
pub struct Itemizer {
    item_str_to_id: FnvHashMap<String, Item>,
    item_id_to_str: Vec<String>,
}

impl Itemizer {
    pub fn new() -> Itemizer {
        Itemizer {
            item_str_to_id: FnvHashMap::default(),
            item_id_to_str: vec![],
        }
    }
    pub fn id_of(&mut self, item: &str) -> Item {
        if let Some(id) = self.item_str_to_id.get(item) {
            return *id;
        }
        let id = Item::with_id(self.item_id_to_str.len() as u32);
        self.item_str_to_id.insert(String::from(item), id);
        self.item_id_to_str.push(String::from(item));
        debug_assert_eq!(self.str_of(id), item);
        id
    }
    #[cfg(test)]
    pub fn get(&self, item: &str) -> Option<Item> {
        self.item_str_to_id.get(item).cloned()
    }
    pub fn str_of(&self, id: Item) -> &str {
        &self.item_id_to_str[id.as_index()]
    }
    pub fn len(&self) -> usize {
        self.item_id_to_str.len()
    }
    #[cfg(test)]
    pub fn to_id_vec(&mut self, items: &[&str]) -> Vec<Item> {
        items.iter().map(|s| self.id_of(s)).collect()
    }

    // Renumbers items after a transaction bag recoding. `map[old]` holds the
    // new identifier, or None if the item was dropped.
    pub fn recode(&mut self, map: &[Option<Item>]) {
        let count = map.iter().filter(|x| x.is_some()).count();
        let mut names: Vec<String> = vec![String::new(); count];
        for (old, new) in map.iter().enumerate() {
            if let Some(new) = new {
                names[new.as_index()] = std::mem::take(&mut self.item_id_to_str[old]);
            }
        }
        self.item_str_to_id.clear();
        for (index, name) in names.iter().enumerate() {
            self.item_str_to_id
                .insert(name.clone(), Item::with_id(index as u32));
        }
        self.item_id_to_str = names;
    }
}

#[cfg(test)]
mod tests {
    use super::Itemizer;
    use crate::item::Item;

    #[test]
    fn test_recode() {
        let mut itemizer = Itemizer::new();
        let ids = itemizer.to_id_vec(&["a", "b", "c", "d"]);
        assert_eq!(ids, crate::item::to_item_vec(&[0, 1, 2, 3]));

        // Drop "b", reverse the others.
        let map = vec![
            Some(Item::with_id(2)),
            None,
            Some(Item::with_id(1)),
            Some(Item::with_id(0)),
        ];
        itemizer.recode(&map);
        assert_eq!(itemizer.len(), 3);
        assert_eq!(itemizer.str_of(Item::with_id(0)), "d");
        assert_eq!(itemizer.str_of(Item::with_id(1)), "c");
        assert_eq!(itemizer.str_of(Item::with_id(2)), "a");
        assert_eq!(itemizer.get("b"), None);
        assert_eq!(itemizer.get("a"), Some(Item::with_id(2)));
        // New names continue after the recoded range.
        assert_eq!(itemizer.id_of("e"), Item::with_id(3));
    }
}
