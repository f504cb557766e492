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

mod cancel;
mod command_line_args;
mod error;
mod fpgpsp;
mod fptree;
mod isect_tree;
mod ista;
mod item;
mod item_counter;
mod itemizer;
mod patred;
mod patricia_tree;
mod pattern_spectrum;
mod prefix_tree;
mod psp_estimate;
mod report;
mod surrogate;
mod tabag;
mod transaction_reader;
mod vec_sets;

use cancel::CancelToken;
use command_line_args::{parse_args_or_exit, Arguments, Mode};
use error::{MineError, MineResult};
use fpgpsp::{generate_spectrum, Algorithm, SpectrumConfig};
use fptree::{mine_fp_growth, ItemSet};
use isect_tree::ReportMode;
use ista::{Ista, IstaConfig};
use item::{Item, Support};
use itemizer::Itemizer;
use patred::{PatternSet, Reduction};
use psp_estimate::{estimate_spectrum, EstimateConfig};
use report::{Reporter, Target};
use transaction_reader::read_transaction_file;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process;
use std::time::Instant;
use tracing::{info, warn, Level};

fn mine_item_sets(args: &Arguments, cancel: &CancelToken) -> MineResult<()> {
    info!("Mining data set: {}", args.input_file_path);
    let timer = Instant::now();
    let bag = read_transaction_file(&args.input_file_path, args.table)?;
    info!(
        "Reading {} transactions took {} seconds.",
        bag.count(),
        timer.elapsed().as_secs()
    );

    let timer = Instant::now();
    let mut reporter = Reporter::new();
    reporter.collect_patterns();
    reporter.set_target(args.target);
    for (offset, &support) in args.border.iter().enumerate() {
        reporter.set_border(args.min_size + offset, support);
    }

    let itemizer = match args.algorithm {
        Algorithm::Ista(variant) => {
            let target = match args.target {
                Target::Closed => ReportMode::Closed,
                Target::Maximal => ReportMode::Maximal,
                _ => {
                    return Err(MineError::invalid(
                        "intersecting transactions finds closed or maximal item sets only",
                    ))
                }
            };
            let config = IstaConfig {
                target,
                support: args.support,
                max_support: args.max_support,
                min_size: args.min_size,
                max_size: args.max_size,
                log_ratio: args.log_ratio,
                variant,
                prune: args.prune,
                filter: args.filter,
                ..IstaConfig::default()
            };
            let prepared = Ista::new(config)?.prepare(bag)?;
            let itemizer = prepared.bag().itemizer().clone();
            let built = prepared.mine(cancel)?;
            info!("Repository holds {} nodes.", built.node_count());
            built.report(&mut reporter)?;
            itemizer
        }
        Algorithm::FpGrowth => {
            let total_weight = bag.total_weight();
            let min_support = args.support.min_count(total_weight);
            reporter.set_support_range(min_support, args.max_support.max_count(total_weight));
            reporter.set_size_range(args.min_size, args.max_size);
            mine_fp_growth(&bag, min_support, &mut reporter, cancel)?;
            bag.itemizer().clone()
        }
    };
    info!(
        "Mining found {} item sets in {} seconds.",
        reporter.count(),
        timer.elapsed().as_secs()
    );

    let mut itemsets = reporter.take_patterns();
    if let Some(method) = args.reduction {
        let found = itemsets.len();
        itemsets = reduce_item_sets(
            itemsets,
            method,
            &args.border,
            args.min_size,
            args.add_isects,
            cancel,
        )?;
        info!("Reduction kept {} of {} item sets.", itemsets.len(), found);
    }

    let mut output = BufWriter::new(File::create(&args.output_file_path)?);
    for itemset in itemsets {
        writeln!(
            output,
            "{} ({})",
            Item::item_vec_to_string(&itemset.items, &itemizer),
            itemset.support
        )?;
    }
    Ok(())
}

// Reduces mined item sets against a decision border that starts at
// min_size, keeping their order.
fn reduce_item_sets(
    itemsets: Vec<ItemSet>,
    method: Reduction,
    border: &[Support],
    min_size: usize,
    add_isects: bool,
    cancel: &CancelToken,
) -> MineResult<Vec<ItemSet>> {
    let max_size = itemsets.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut patterns: PatternSet<usize> = PatternSet::new(itemsets.len(), max_size);
    for (index, itemset) in itemsets.iter().enumerate() {
        patterns.add_pattern(&itemset.items, itemset.support, index)?;
    }
    for (offset, &support) in border.iter().enumerate() {
        patterns.set_border(min_size + offset, support);
    }
    patterns.reduce(method, add_isects, cancel);
    let mut kept = vec![false; itemsets.len()];
    for (_, _, &index) in patterns.kept() {
        kept[index] = true;
    }
    Ok(itemsets
        .into_iter()
        .zip(kept)
        .filter(|(_, keep)| *keep)
        .map(|(itemset, _)| itemset)
        .collect())
}

fn generate_pattern_spectrum(args: &Arguments, cancel: &CancelToken) -> MineResult<()> {
    let bag = read_transaction_file(&args.input_file_path, args.table)?;
    let config = SpectrumConfig {
        target: args.target,
        support: args.support,
        min_size: args.min_size,
        max_size: args.max_size,
        algorithm: args.algorithm,
        surrogate: args.surrogate,
        count: args.count,
        seed: args.seed,
        workers: args.threads,
    };

    info!(
        "Generating pattern spectrum from {} surrogate data sets...",
        args.count
    );
    let timer = Instant::now();
    let step = (args.count / 10).max(1);
    let progress: &(dyn Fn(usize) + Sync) = &move |done: usize| {
        if done % step == 0 {
            info!("{} data sets done.", done);
        }
    };
    let spectrum = generate_spectrum(&bag, &config, Some(progress), cancel)?;
    info!(
        "Generating pattern spectrum of {} patterns in {} signatures took {} seconds.",
        spectrum.total(),
        spectrum.signature_count(),
        timer.elapsed().as_secs()
    );

    let mut output = BufWriter::new(File::create(&args.output_file_path)?);
    // Counts are averaged over the surrogate data sets.
    spectrum.write(&mut output, config.output_scale())?;
    Ok(())
}

fn estimate_pattern_spectrum(args: &Arguments) -> MineResult<()> {
    let bag = read_transaction_file(&args.input_file_path, args.table)?;
    let config = EstimateConfig {
        support: args.support,
        min_size: args.min_size,
        max_size: args.max_size,
        equiv: args.equiv,
        alpha: args.alpha,
        samples: args.samples,
        seed: args.seed,
    };
    let spectrum = estimate_spectrum(&bag, &config)?;
    let mut output = BufWriter::new(File::create(&args.output_file_path)?);
    spectrum.write(&mut output, 1.0 / args.equiv as f64)?;
    Ok(())
}

// Splits a pattern line "a b c (5)" into its items and support.
fn parse_pattern_line(line: &str) -> MineResult<Option<(Vec<&str>, Support)>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let invalid = || MineError::invalid(format!("invalid pattern line '{}'", line));
    let open = line.rfind('(').ok_or_else(invalid)?;
    let support = line[open + 1..]
        .trim_end_matches(')')
        .trim()
        .parse::<Support>()
        .map_err(|_| invalid())?;
    let items: Vec<&str> = line[..open]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(Some((items, support)))
}

fn reduce_patterns(args: &Arguments, cancel: &CancelToken) -> MineResult<()> {
    let timer = Instant::now();
    let reader = BufReader::new(File::open(&args.input_file_path)?);
    let mut lines: Vec<String> = vec![];
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    let mut extent = 0;
    let mut max_size = 0;
    for line in &lines {
        if let Some((items, _)) = parse_pattern_line(line)? {
            extent += items.len();
            max_size = max_size.max(items.len());
        }
    }

    let mut patterns: PatternSet<&str> =
        PatternSet::with_itemizer(lines.len(), max_size, extent, Itemizer::new());
    for line in &lines {
        if let Some((items, support)) = parse_pattern_line(line)? {
            patterns.begin_pattern(line.as_str())?;
            for item in items {
                patterns.add_item(item)?;
            }
            patterns.finish_pattern(support)?;
        }
    }
    for (offset, &support) in args.border.iter().enumerate() {
        patterns.set_border(args.min_size + offset, support);
    }
    info!(
        "Reading {} patterns took {} seconds.",
        patterns.len(),
        timer.elapsed().as_secs()
    );

    let timer = Instant::now();
    let method = args.reduction.unwrap_or(Reduction::Coins1);
    let kept = patterns.reduce(method, args.add_isects, cancel);
    info!(
        "Reduction kept {} of {} patterns in {} seconds.",
        kept,
        patterns.len(),
        timer.elapsed().as_secs()
    );

    let mut output = BufWriter::new(File::create(&args.output_file_path)?);
    for (_, _, line) in patterns.kept() {
        writeln!(output, "{}", line.trim())?;
    }
    Ok(())
}

// Interrupts stop the running operation; a second one ends the process.
fn cancel_on_interrupt() -> CancelToken {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    let result = ctrlc::set_handler(move || {
        if handler.is_cancelled() {
            process::exit(130);
        }
        eprintln!("Stopping...");
        handler.cancel();
    });
    if let Err(err) = result {
        warn!("Failed to install interrupt handler: {}", err);
    }
    cancel
}

fn run(args: &Arguments) -> MineResult<()> {
    let cancel = cancel_on_interrupt();
    let start = Instant::now();
    match args.mode {
        Mode::Ista => mine_item_sets(args, &cancel)?,
        Mode::GenPsp => generate_pattern_spectrum(args, &cancel)?,
        Mode::EstPsp => estimate_pattern_spectrum(args)?,
        Mode::Reduce => reduce_patterns(args, &cancel)?,
    }
    info!("Total runtime: {} seconds", start.elapsed().as_secs());
    Ok(())
}

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", err);
    }

    let arguments = parse_args_or_exit();

    if let Err(err) = run(&arguments) {
        println!("Error: {}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::to_item_vec;

    #[test]
    fn test_parse_pattern_line() {
        assert_eq!(
            parse_pattern_line("a b c (5)").unwrap(),
            Some((vec!["a", "b", "c"], 5))
        );
        assert_eq!(parse_pattern_line("x,y ( 12 )").unwrap(), Some((vec!["x", "y"], 12)));
        assert_eq!(parse_pattern_line("   ").unwrap(), None);
        assert!(parse_pattern_line("a b c").is_err());
        assert!(parse_pattern_line("a b (five)").is_err());
    }

    #[test]
    fn test_reduce_item_sets() {
        let itemsets = vec![
            ItemSet::new(to_item_vec(&[0]), 12),
            ItemSet::new(to_item_vec(&[0, 1]), 10),
            ItemSet::new(to_item_vec(&[0, 1, 2]), 8),
            ItemSet::new(to_item_vec(&[3, 4]), 3),
        ];
        let cancel = CancelToken::new();
        // Single items always lose against a superset. 10 - 8 is below the
        // pair border of 5, so {0,1,2} explains {0,1}.
        let kept = reduce_item_sets(itemsets.clone(), Reduction::Coins0, &[5, 4], 2, false, &cancel)
            .unwrap();
        assert_eq!(kept, vec![itemsets[2].clone(), itemsets[3].clone()]);

        // With a pair border of 1 the pair is kept instead.
        let kept = reduce_item_sets(itemsets.clone(), Reduction::Coins0, &[1], 2, false, &cancel)
            .unwrap();
        assert_eq!(kept, vec![itemsets[1].clone(), itemsets[3].clone()]);

        let kept = reduce_item_sets(itemsets.clone(), Reduction::None, &[], 2, false, &cancel).unwrap();
        assert_eq!(kept, itemsets);
    }
}
