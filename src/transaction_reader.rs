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

use crate::error::MineResult;
use crate::item::Item;
use crate::itemizer::Itemizer;
use crate::tabag::TransactionBag;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader};
use tracing::{debug, warn};

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

pub struct TransactionReader<'a, R> {
    reader: R,
    itemizer: &'a mut Itemizer,
    table: bool,
}

impl<'a, R: BufRead> TransactionReader<'a, R> {
    pub fn new(reader: R, itemizer: &'a mut Itemizer) -> TransactionReader<'a, R> {
        TransactionReader {
            reader,
            itemizer,
            table: false,
        }
    }

    // In table mode the j-th field with value v becomes the item "j=v".
    pub fn table(mut self, table: bool) -> Self {
        self.table = table;
        self
    }
}

impl<'a, R: BufRead> Iterator for TransactionReader<'a, R> {
    type Item = io::Result<Vec<Item>>;
    fn next(&mut self) -> Option<io::Result<Vec<Item>>> {
        let mut line = String::new();
        loop {
            line.clear();
            let len = match self.reader.read_line(&mut line) {
                Ok(len) => len,
                Err(err) => return Some(Err(err)),
            };
            if len == 0 {
                return None;
            }
            let mut splits: Vec<Item> = if self.table {
                let itemizer = &mut self.itemizer;
                split_fields(&line)
                    .enumerate()
                    .map(|(column, value)| itemizer.id_of(&format!("{}={}", column, value)))
                    .collect()
            } else {
                let itemizer = &mut self.itemizer;
                split_fields(&line).map(|s| itemizer.id_of(s)).collect()
            };

            // Some input files have transactions with duplicates items.
            // Remove any duplicates here.
            splits.sort();
            dedupe_sorted(&mut splits);

            if !splits.is_empty() {
                return Some(Ok(splits));
            }
        }
    }
}

fn dedupe_sorted(v: &mut Vec<Item>) {
    let mut i = 0;
    let mut k = 0;
    while i < v.len() {
        v[k] = v[i];
        while i < v.len() && v[k] == v[i] {
            i += 1;
        }
        k += 1;
    }
    assert!(k <= v.len());
    v.resize(k, Item::null());
}

// Column index of every "j=v" item name.
fn table_columns(itemizer: &Itemizer) -> Vec<u32> {
    (0..itemizer.len())
        .map(|id| {
            let name = itemizer.str_of(Item::with_id(id as u32));
            name.split('=')
                .next()
                .and_then(|c| c.parse::<u32>().ok())
                .unwrap_or(0)
        })
        .collect()
}

pub fn read_transactions<R: BufRead>(reader: R, table: bool) -> MineResult<TransactionBag> {
    let mut itemizer = Itemizer::new();
    let mut transactions: Vec<Vec<Item>> = vec![];
    let mut widths: Vec<usize> = vec![];
    for transaction in TransactionReader::new(reader, &mut itemizer).table(table) {
        let transaction = transaction?;
        widths.push(transaction.len());
        transactions.push(transaction);
    }

    let rectangular = widths.windows(2).all(|w| w[0] == w[1]);
    let columns = if table && rectangular {
        Some(table_columns(&itemizer))
    } else {
        if table {
            warn!("Table rows differ in length; treating input as plain transactions.");
        }
        None
    };

    let mut bag = TransactionBag::new(itemizer);
    for t in transactions {
        bag.add(t, 1);
    }
    if let Some(columns) = columns {
        bag.set_columns(columns);
    }
    debug!(
        "Read {} transactions over {} items.",
        bag.count(),
        bag.item_count()
    );
    Ok(bag)
}

pub fn read_transaction_file(path: &str, table: bool) -> MineResult<TransactionBag> {
    let file = File::open(path)?;
    read_transactions(BufReader::new(file), table)
}
