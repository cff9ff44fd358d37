//! CLI driver (§4.9): `discretize` and `score` subcommands, a `--config`
//! TOML override layer, and `-v`/`-vv` logging verbosity.

mod config;
mod discretize_cmd;
mod score_cmd;

use crate::error::BlinkResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blink")]
#[command(author, version, about = "Batch engine for comparing large collections of tandem mass spectra")]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discretize one or more peak-list files into a sparse archive
    Discretize {
        /// Input `.mgf`/`.mzML` files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Drop spectra with no peaks before discretizing
        #[arg(long)]
        trim: bool,

        /// Merge peaks closer than 2*bin_width before discretizing
        #[arg(long)]
        dedup: bool,

        /// Bin width in Da
        #[arg(short = 'b', long)]
        bin_width: Option<f64>,

        /// Intensity-raising power
        #[arg(short = 'i', long)]
        intensity_power: Option<f64>,

        /// Output directory
        #[arg(short = 'o', long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Overwrite an existing output archive
        #[arg(short = 'f', long)]
        force: bool,

        /// Load options from a TOML config file (CLI flags take precedence)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Score one archive against itself, or two archives against each other
    Score {
        /// Query archive
        archive: PathBuf,

        /// Reference archive (defaults to scoring `archive` against itself)
        archive2: Option<PathBuf>,

        /// Kernel tolerance in Da
        #[arg(short = 't', long)]
        tolerance: Option<f64>,

        /// Mass differences the network kernel reacts over
        #[arg(short = 'd', long = "mass-diff", value_name = "DA")]
        mass_diffs: Option<Vec<f64>>,

        /// Number of recursive mass-diff combination steps
        #[arg(short = 'r', long)]
        react_steps: Option<u32>,

        /// Minimum network score to keep a hit
        #[arg(short = 's', long)]
        min_score: Option<f64>,

        /// Minimum match count to keep a hit
        #[arg(short = 'm', long)]
        min_matches: Option<f64>,

        /// Also keep any hit whose match count alone reaches this value,
        /// regardless of score (extension beyond the default rule)
        #[arg(long)]
        good_matches: Option<f64>,

        /// Use the OR-all-four threshold rule instead of the default
        /// network-score AND rule
        #[arg(long)]
        or_all_four: bool,

        /// Write a sparse result archive instead of a tab-separated table
        #[arg(long)]
        fast_format: bool,

        /// Output path
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short = 'f', long)]
        force: bool,

        /// Load options from a TOML config file (CLI flags take precedence)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> BlinkResult<()> {
    match cli.command {
        Commands::Discretize {
            files,
            trim,
            dedup,
            bin_width,
            intensity_power,
            out_dir,
            force,
            config,
        } => discretize_cmd::run(discretize_cmd::DiscretizeArgs {
            files,
            trim,
            dedup,
            bin_width,
            intensity_power,
            out_dir,
            force,
            config,
        }),
        Commands::Score {
            archive,
            archive2,
            tolerance,
            mass_diffs,
            react_steps,
            min_score,
            min_matches,
            good_matches,
            or_all_four,
            fast_format,
            output,
            force,
            config,
        } => score_cmd::run(score_cmd::ScoreArgs {
            archive,
            archive2,
            tolerance,
            mass_diffs,
            react_steps,
            min_score,
            min_matches,
            good_matches,
            or_all_four,
            fast_format,
            output,
            force,
            config,
        }),
    }
}
