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

use crate::itemizer::Itemizer;

/// Sum of transaction weights.
pub type Support = u32;

/// Largest representable support; used as "always significant".
pub const SUPPORT_MAX: Support = Support::MAX;

const NULL_ID: u32 = u32::MAX;

#[derive(Copy, Clone, Hash, PartialOrd, PartialEq, Eq, Ord, Debug)]
pub struct Item {
    id: u32,
}

impl Item {
    pub fn null() -> Item {
        Item { id: NULL_ID }
    }
    pub fn with_id(id: u32) -> Item {
        Item { id }
    }
    #[cfg(test)]
    pub fn id(&self) -> u32 {
        self.id
    }
    pub fn as_index(&self) -> usize {
        self.id as usize
    }
    pub fn is_null(&self) -> bool {
        self.id == NULL_ID
    }
    pub fn item_vec_to_string(items: &[Item], itemizer: &Itemizer) -> String {
        let mut a: Vec<&str> = items.iter().map(|&id| itemizer.str_of(id)).collect();
        ensure_sorted(&mut a);
        a.join(" ")
    }
}

// If all items in the itemset convert to an integer, order by that integer,
// otherwise order lexicographically.
fn ensure_sorted(a: &mut Vec<&str>) {
    let all_items_convert_to_ints = a.iter().all(|x| x.parse::<u32>().is_ok());
    if all_items_convert_to_ints {
        a.sort_by_key(|x| x.parse::<u32>().unwrap_or(0));
    } else {
        a.sort();
    }
}

#[cfg(test)]
pub fn to_item_vec(nums: &[u32]) -> Vec<Item> {
    nums.iter().map(|&i| Item::with_id(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::Item;
    use crate::itemizer::Itemizer;

    #[test]
    fn test_item_vec_to_string() {
        let mut itemizer = Itemizer::new();
        let numeric: Vec<Item> = ["10", "9", "100"].iter().map(|s| itemizer.id_of(s)).collect();
        assert_eq!(Item::item_vec_to_string(&numeric, &itemizer), "9 10 100");

        let mut itemizer = Itemizer::new();
        let named: Vec<Item> = ["milk", "bread", "9"].iter().map(|s| itemizer.id_of(s)).collect();
        assert_eq!(Item::item_vec_to_string(&named, &itemizer), "9 bread milk");
    }

    #[test]
    fn test_null() {
        assert!(Item::null().is_null());
        assert!(!Item::with_id(0).is_null());
    }
}
