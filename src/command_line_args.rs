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

use std::env;
use std::io;
use std::process;

use argparse::{ArgumentParser, Store, StoreOption, StoreTrue};

use crate::error::{MineError, MineResult};
use crate::fpgpsp::Algorithm;
use crate::isect_tree::TreeVariant;
use crate::item::Support;
use crate::patred::Reduction;
use crate::report::Target;
use crate::surrogate::Surrogate;
use crate::tabag::Threshold;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    // Mine closed or maximal item sets.
    Ista,
    // Generate a pattern spectrum from surrogate data sets.
    GenPsp,
    // Estimate a pattern spectrum.
    EstPsp,
    // Reduce a set of mined patterns.
    Reduce,
}

pub struct Arguments {
    pub mode: Mode,
    pub input_file_path: String,
    pub output_file_path: String,
    pub table: bool,
    pub target: Target,
    pub support: Threshold,
    pub max_support: Threshold,
    pub min_size: usize,
    pub max_size: usize,
    pub algorithm: Algorithm,
    pub surrogate: Surrogate,
    pub count: usize,
    pub seed: u64,
    pub threads: i32,
    pub equiv: usize,
    pub alpha: f64,
    pub samples: usize,
    // Decision border, starting at min_size.
    pub border: Vec<Support>,
    // Reduction of the mined or read patterns; reduce mode defaults to coins1.
    pub reduction: Option<Reduction>,
    pub add_isects: bool,
    pub log_ratio: Option<f64>,
    pub prune: bool,
    pub filter: bool,
}

fn parse_mode(mode: &str) -> MineResult<Mode> {
    match mode {
        "ista" => Ok(Mode::Ista),
        "genpsp" => Ok(Mode::GenPsp),
        "estpsp" => Ok(Mode::EstPsp),
        "reduce" => Ok(Mode::Reduce),
        _ => Err(MineError::invalid(format!("unknown mode '{}'", mode))),
    }
}

fn parse_algorithm(algo: &str, tree: &str) -> MineResult<Algorithm> {
    let variant = match tree {
        "auto" => TreeVariant::Auto,
        "prefix" => TreeVariant::Prefix,
        "patricia" => TreeVariant::Patricia,
        _ => return Err(MineError::invalid(format!("unknown tree variant '{}'", tree))),
    };
    match algo {
        "fpgrowth" => Ok(Algorithm::FpGrowth),
        "ista" => Ok(Algorithm::Ista(variant)),
        _ => Err(MineError::invalid(format!("unknown algorithm '{}'", algo))),
    }
}

// Parses a decision border given as "s1:s2:...".
fn parse_border(border: &str) -> MineResult<Vec<Support>> {
    border
        .split(':')
        .map(|s| {
            s.trim()
                .parse::<Support>()
                .map_err(|_| MineError::invalid(format!("invalid border entry '{}'", s)))
        })
        .collect()
}

fn or_exit<T>(result: MineResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

pub fn parse_args_or_exit() -> Arguments {
    let mut mode = String::from("ista");
    let mut input_file_path = String::new();
    let mut output_file_path = String::new();
    let mut table = false;
    let mut target = 'c';
    let mut support: Option<f64> = None;
    let mut max_support = 100.0;
    let mut min_size: Option<usize> = None;
    let mut max_size: Option<usize> = None;
    let mut algo: Option<String> = None;
    let mut tree = String::from("auto");
    let mut surrogate = 'p';
    let mut count = 1000;
    let mut seed = 0;
    let mut threads = 0;
    let mut equiv = 10000;
    let mut alpha = 0.5;
    let mut samples = 1000;
    let mut border: Option<String> = None;
    let mut reduction: Option<u32> = None;
    let mut add_isects = false;
    let mut log_ratio: Option<f64> = None;
    let mut no_prune = false;
    let mut filter = false;

    {
        let mut parser = ArgumentParser::new();
        parser.set_description(
            "Closed and maximal item set mining, pattern spectra and pattern set reduction.",
        );

        parser
            .refer(&mut mode)
            .add_option(
                &["--mode"],
                Store,
                "One of ista (mine item sets), genpsp (generate a pattern spectrum), \
                 estpsp (estimate a pattern spectrum) or reduce (reduce a pattern set).",
            )
            .metavar("mode");

        parser
            .refer(&mut input_file_path)
            .add_option(
                &["--input"],
                Store,
                "Input transactions, one per line with comma or space separated items. \
                 In reduce mode, patterns as 'a b c (support)'.",
            )
            .metavar("file_path")
            .required();

        parser
            .refer(&mut output_file_path)
            .add_option(&["--output"], Store, "File path in which to store the result.")
            .metavar("file_path")
            .required();

        parser.refer(&mut table).add_option(
            &["--table"],
            StoreTrue,
            "Read the input as a table; field j with value v becomes item j=v.",
        );

        parser
            .refer(&mut target)
            .add_option(
                &["--target"],
                Store,
                "Item set type: s (frequent), c (closed), m (maximal), g (generators).",
            )
            .metavar("char");

        parser
            .refer(&mut support)
            .add_option(
                &["--support"],
                StoreOption,
                "Minimum support in percent of the transactions; negative values are \
                 absolute counts. Defaults to 10 for ista and -2 otherwise.",
            )
            .metavar("threshold");

        parser
            .refer(&mut max_support)
            .add_option(
                &["--max-support"],
                Store,
                "Maximum support, in the same units as --support.",
            )
            .metavar("threshold");

        parser
            .refer(&mut min_size)
            .add_option(
                &["--min-size"],
                StoreOption,
                "Minimum item set size. Defaults to 1 for ista and 2 otherwise.",
            )
            .metavar("n");

        parser
            .refer(&mut max_size)
            .add_option(&["--max-size"], StoreOption, "Maximum item set size.")
            .metavar("n");

        parser
            .refer(&mut algo)
            .add_option(
                &["--algo"],
                StoreOption,
                "Miner, ista or fpgrowth. Defaults to ista for ista mode and fpgrowth \
                 for genpsp.",
            )
            .metavar("name");

        parser
            .refer(&mut tree)
            .add_option(
                &["--tree"],
                Store,
                "Intersection tree: auto, prefix or patricia.",
            )
            .metavar("name");

        parser
            .refer(&mut surrogate)
            .add_option(
                &["--surrogate"],
                Store,
                "Surrogate data: i (identity), r (random), p (swap), s (shuffle table).",
            )
            .metavar("char");

        parser
            .refer(&mut count)
            .add_option(&["--count"], Store, "Number of surrogate data sets.")
            .metavar("n");

        parser
            .refer(&mut seed)
            .add_option(&["--seed"], Store, "Random seed; 0 uses the clock.")
            .metavar("n");

        parser
            .refer(&mut threads)
            .add_option(
                &["--threads"],
                Store,
                "Worker threads; 0 or less uses all processors.",
            )
            .metavar("n");

        parser
            .refer(&mut equiv)
            .add_option(
                &["--equiv"],
                Store,
                "Equivalent number of surrogate data sets of an estimate.",
            )
            .metavar("n");

        parser
            .refer(&mut alpha)
            .add_option(
                &["--alpha"],
                Store,
                "Support dispersion of an estimate; 0 is Poisson.",
            )
            .metavar("value");

        parser
            .refer(&mut samples)
            .add_option(
                &["--samples"],
                Store,
                "Item sets sampled per size for an estimate.",
            )
            .metavar("n");

        parser
            .refer(&mut border)
            .add_option(
                &["--border"],
                StoreOption,
                "Decision border s1:s2:..., the minimum support per size starting at \
                 the minimum size.",
            )
            .metavar("supports");

        parser
            .refer(&mut reduction)
            .add_option(
                &["--reduce"],
                StoreOption,
                "Reduction method: 0 none, 1 coins0, 2 coins1, 3 items2, 4 cover0, \
                 5 cover1, 6 lenient0, 7 lenient1, 8 strict0, 9 strict1. Defaults to 2 \
                 in reduce mode; in ista mode the mined sets are reduced only if given.",
            )
            .metavar("id");

        parser.refer(&mut add_isects).add_option(
            &["--isect"],
            StoreTrue,
            "Compare intersections of patterns that reach the border as well.",
        );

        parser
            .refer(&mut log_ratio)
            .add_option(
                &["--eval"],
                StoreOption,
                "Minimum binary logarithm of support over expected support.",
            )
            .metavar("threshold");

        parser.refer(&mut no_prune).add_option(
            &["--no-prune"],
            StoreTrue,
            "Do not prune the repository while intersecting.",
        );

        parser.refer(&mut filter).add_option(
            &["--filter"],
            StoreTrue,
            "Remove infrequent sets from the repository before reporting maximal sets.",
        );

        if env::args().count() == 1 {
            parser.print_help("Usage:", &mut io::stderr()).unwrap();
            process::exit(1);
        }

        match parser.parse_args() {
            Ok(()) => {}
            Err(err) => {
                process::exit(err);
            }
        }
    }

    let mode = or_exit(parse_mode(&mode));
    let default_algo = if mode == Mode::Ista { "ista" } else { "fpgrowth" };
    let algorithm = or_exit(parse_algorithm(
        algo.as_deref().unwrap_or(default_algo),
        &tree,
    ));
    let support = match support {
        Some(support) => Threshold::from_arg(support),
        None if mode == Mode::Ista => Threshold::Percent(10.0),
        None => Threshold::Absolute(2),
    };
    let min_size = min_size.unwrap_or(if mode == Mode::Ista { 1 } else { 2 });
    let max_size = max_size.unwrap_or(usize::MAX);
    let border = match border {
        Some(border) => or_exit(parse_border(&border)),
        None => vec![],
    };

    if let Threshold::Percent(percent) = support {
        if percent > 100.0 {
            eprintln!("Minimum support must be in range [0,100]");
            process::exit(1);
        }
    }

    if min_size > max_size {
        eprintln!("Minimum size must not exceed maximum size");
        process::exit(1);
    }

    if alpha < 0.0 {
        eprintln!("Dispersion must not be negative");
        process::exit(1);
    }

    Arguments {
        mode,
        input_file_path,
        output_file_path,
        table,
        target: or_exit(Target::from_char(target)),
        support,
        max_support: Threshold::from_arg(max_support),
        min_size,
        max_size,
        algorithm,
        surrogate: or_exit(Surrogate::from_char(surrogate)),
        count,
        seed,
        threads,
        equiv,
        alpha,
        samples,
        border,
        reduction: reduction.map(|id| or_exit(Reduction::from_id(id))),
        add_isects,
        log_ratio,
        prune: !no_prune,
        filter,
    }
}
