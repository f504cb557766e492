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

//! Pattern spectrum: number of patterns per (size, support) signature.

use crate::error::{MineError, MineResult};
use crate::item::Support;
use std::io::{self, Write};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternSpectrum {
    min_size: usize,
    max_size: usize,
    min_support: Support,
    max_support: Support,
    // rows[size - min_size][support - min_support], grown on demand.
    rows: Vec<Vec<u64>>,
    total: u64,
}

impl PatternSpectrum {
    pub fn new(
        min_size: usize,
        max_size: usize,
        min_support: Support,
        max_support: Support,
    ) -> MineResult<PatternSpectrum> {
        if min_size > max_size || min_support > max_support {
            return Err(MineError::invalid(format!(
                "empty pattern spectrum range: sizes {}..={}, supports {}..={}",
                min_size, max_size, min_support, max_support
            )));
        }
        Ok(PatternSpectrum {
            min_size,
            max_size,
            min_support,
            max_support,
            rows: Vec::new(),
            total: 0,
        })
    }

    // Counts outside the size/support ranges are ignored.
    pub fn add_count(&mut self, size: usize, support: Support, count: u64) -> MineResult<()> {
        if count == 0
            || size < self.min_size
            || size > self.max_size
            || support < self.min_support
            || support > self.max_support
        {
            return Ok(());
        }
        let row = size - self.min_size;
        if self.rows.len() <= row {
            self.rows.try_reserve(row + 1 - self.rows.len())?;
            self.rows.resize(row + 1, Vec::new());
        }
        let column = (support - self.min_support) as usize;
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.try_reserve(column + 1 - cells.len())?;
            cells.resize(column + 1, 0);
        }
        cells[column] += count;
        self.total += count;
        Ok(())
    }

    // Cell-wise sum; cells of other outside this spectrum's ranges are
    // dropped.
    pub fn add_spectrum(&mut self, other: &PatternSpectrum) -> MineResult<()> {
        for (size, support, count) in other.iter() {
            self.add_count(size, support, count)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn count(&self, size: usize, support: Support) -> u64 {
        if size < self.min_size || support < self.min_support {
            return 0;
        }
        self.rows
            .get(size - self.min_size)
            .and_then(|cells| cells.get((support - self.min_support) as usize))
            .cloned()
            .unwrap_or(0)
    }

    // Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    // Number of (size, support) signatures with a non-zero count.
    pub fn signature_count(&self) -> usize {
        self.rows
            .iter()
            .map(|cells| cells.iter().filter(|&&c| c > 0).count())
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Support, u64)> + '_ {
        let min_size = self.min_size;
        let min_support = self.min_support;
        self.rows.iter().enumerate().flat_map(move |(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, &count)| count > 0)
                .map(move |(column, &count)| {
                    (min_size + row, min_support + column as Support, count)
                })
        })
    }

    // Writes "size<TAB>support<TAB>frequency" rows; frequencies are the
    // counts multiplied by scale.
    pub fn write<W: Write>(&self, output: &mut W, scale: f64) -> io::Result<()> {
        for (size, support, count) in self.iter() {
            if (scale - 1.0).abs() < f64::EPSILON {
                writeln!(output, "{}\t{}\t{}", size, support, count)?;
            } else {
                writeln!(output, "{}\t{}\t{}", size, support, count as f64 * scale)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PatternSpectrum;

    #[test]
    fn test_add_and_query() {
        let mut psp = PatternSpectrum::new(2, 4, 3, 100).unwrap();
        psp.add_count(2, 5, 1).unwrap();
        psp.add_count(2, 5, 2).unwrap();
        psp.add_count(3, 3, 1).unwrap();
        psp.add_count(3, 9, 4).unwrap();
        // Outside the ranges.
        psp.add_count(1, 5, 1).unwrap();
        psp.add_count(5, 5, 1).unwrap();
        psp.add_count(2, 2, 1).unwrap();

        assert_eq!(psp.count(2, 5), 3);
        assert_eq!(psp.count(3, 9), 4);
        assert_eq!(psp.count(4, 9), 0);
        assert_eq!(psp.total(), 8);
        assert_eq!(psp.signature_count(), 3);
        assert_eq!(
            psp.iter().collect::<Vec<_>>(),
            vec![(2, 5, 3), (3, 3, 1), (3, 9, 4)]
        );
    }

    #[test]
    fn test_merge_is_commutative() {
        let mut a = PatternSpectrum::new(1, 5, 1, 50).unwrap();
        let mut b = PatternSpectrum::new(1, 5, 1, 50).unwrap();
        a.add_count(2, 7, 1).unwrap();
        a.add_count(3, 2, 5).unwrap();
        b.add_count(2, 7, 2).unwrap();
        b.add_count(4, 30, 1).unwrap();

        let mut ab = PatternSpectrum::new(1, 5, 1, 50).unwrap();
        ab.add_spectrum(&a).unwrap();
        ab.add_spectrum(&b).unwrap();
        let mut ba = PatternSpectrum::new(1, 5, 1, 50).unwrap();
        ba.add_spectrum(&b).unwrap();
        ba.add_spectrum(&a).unwrap();

        assert_eq!(ab.iter().collect::<Vec<_>>(), ba.iter().collect::<Vec<_>>());
        assert_eq!(ab.count(2, 7), 3);
        assert_eq!(ab.total(), 9);
    }

    #[test]
    fn test_write() {
        let mut psp = PatternSpectrum::new(1, 3, 1, 10).unwrap();
        psp.add_count(2, 4, 10).unwrap();
        let mut out: Vec<u8> = vec![];
        psp.write(&mut out, 1.0).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2\t4\t10\n");
        let mut out: Vec<u8> = vec![];
        psp.write(&mut out, 0.5).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2\t4\t5\n");
    }

    #[test]
    fn test_invalid_range() {
        assert!(PatternSpectrum::new(3, 2, 1, 10).is_err());
    }
}
