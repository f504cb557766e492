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

// All functions assume their inputs are sorted and duplicate free.

// Writes the items in both a and b into out; returns the intersection size.
pub fn intersection_into<T>(a: &[T], b: &[T], out: &mut Vec<T>) -> usize
where
    T: Ord + Copy,
{
    out.clear();
    let mut ap = 0;
    let mut bp = 0;
    while ap < a.len() && bp < b.len() {
        if a[ap] < b[bp] {
            ap += 1;
        } else if b[bp] < a[ap] {
            bp += 1;
        } else {
            out.push(a[ap]);
            ap += 1;
            bp += 1;
        }
    }
    out.len()
}

// True if a is a proper subset of b.
pub fn is_proper_subset<T>(a: &[T], b: &[T]) -> bool
where
    T: Ord,
{
    if a.len() >= b.len() {
        return false;
    }
    let mut ap = 0;
    let mut bp = 0;
    while ap < a.len() && bp < b.len() {
        if a[ap] < b[bp] {
            return false;
        } else if b[bp] < a[ap] {
            bp += 1;
        } else {
            ap += 1;
            bp += 1;
        }
    }
    ap == a.len()
}

// Copy of items without the given item.
pub fn split_out_item<T>(items: &[T], item: T) -> Vec<T>
where
    T: PartialEq + Clone,
{
    items.iter().filter(|x| **x != item).cloned().collect()
}

#[cfg(test)]
mod tests {
    use crate::item::{to_item_vec, Item};

    #[test]
    fn test_intersection() {
        use super::intersection_into;

        let test_cases: Vec<(Vec<Item>, Vec<Item>, Vec<Item>)> = [
            (vec![1, 2, 3], vec![4, 5, 6], vec![]),
            (vec![1, 2, 3], vec![3, 4, 5, 6], vec![3]),
            (vec![1, 3, 5, 7], vec![2, 3, 4, 7], vec![3, 7]),
            (vec![], vec![1], vec![]),
            (vec![1, 2], vec![1, 2], vec![1, 2]),
        ]
        .iter()
        .map(|(a, b, c)| (to_item_vec(a), to_item_vec(b), to_item_vec(c)))
        .collect();

        let mut out = vec![];
        for (a, b, c) in &test_cases {
            assert_eq!(intersection_into(a, b, &mut out), c.len());
            assert_eq!(&out, c);
            intersection_into(b, a, &mut out);
            assert_eq!(&out, c);
        }
    }

    #[test]
    fn test_is_proper_subset() {
        use super::is_proper_subset;

        let cases = [
            (vec![], vec![1], true),
            (vec![1], vec![1], false),
            (vec![1, 3], vec![1, 2, 3], true),
            (vec![1, 4], vec![1, 2, 3], false),
            (vec![0, 1], vec![1, 2, 3], false),
            (vec![1, 2, 3], vec![1, 3], false),
        ];
        for (a, b, expected) in cases.iter() {
            assert_eq!(
                is_proper_subset(&to_item_vec(a), &to_item_vec(b)),
                *expected,
                "{:?} < {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_split_out_item() {
        use super::split_out_item;
        let cases: Vec<(Vec<u32>, u32, Vec<u32>)> = vec![
            (vec![1], 1, vec![]),
            (vec![1, 2, 3], 1, vec![2, 3]),
            (vec![1, 2, 3], 2, vec![1, 3]),
            (vec![1, 2, 3], 3, vec![1, 2]),
        ];
        for (a, v, b) in cases.into_iter() {
            assert_eq!(
                split_out_item(&to_item_vec(&a), Item::with_id(v)),
                to_item_vec(&b)
            );
        }
    }
}
