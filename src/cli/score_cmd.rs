//! `blink score` (§4.9): score one archive against itself, or two archives
//! against each other, and emit either a `--fast-format` result archive or a
//! tab-separated hit table.

use crate::archive::{read_store, write_result};
use crate::cli::config::{resolve, Config};
use crate::error::BlinkResult;
use crate::filter::{filter_hits, top_k, FilterMode, FilterOptions};
use crate::score::{score, ScoreOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct ScoreArgs {
    pub archive: PathBuf,
    pub archive2: Option<PathBuf>,
    pub tolerance: Option<f64>,
    pub mass_diffs: Option<Vec<f64>>,
    pub react_steps: Option<u32>,
    pub min_score: Option<f64>,
    pub min_matches: Option<f64>,
    pub good_matches: Option<f64>,
    pub or_all_four: bool,
    pub fast_format: bool,
    pub output: Option<PathBuf>,
    pub force: bool,
    pub config: Option<PathBuf>,
}

pub fn run(args: ScoreArgs) -> BlinkResult<()> {
    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?.score,
        None => Default::default(),
    };

    let tolerance = resolve(args.tolerance, file_config.tolerance, 0.01);
    let mass_diffs = resolve(args.mass_diffs, file_config.mass_diffs, vec![0.0]);
    let react_steps = resolve(args.react_steps, file_config.react_steps, 1);
    let min_score = resolve(args.min_score, file_config.min_score, 0.5);
    let min_matches = resolve(args.min_matches, file_config.min_matches, 5.0);
    let good_matches = args.good_matches.or(file_config.good_matches);
    let or_all_four = resolve(Some(args.or_all_four), file_config.or_all_four, false);
    let fast_format = args.fast_format || file_config.fast_format.unwrap_or(false);

    let query = read_store(&args.archive)?;
    let reference = match &args.archive2 {
        Some(path) => read_store(path)?,
        None => query.clone(),
    };

    log::info!(
        "Score Start: {} vs {}",
        args.archive.display(),
        args.archive2.as_ref().unwrap_or(&args.archive).display()
    );

    let score_opts = ScoreOptions {
        tolerance,
        mass_diffs,
        react_steps,
        expansion_budget: None,
        which: Default::default(),
    };
    let result = score(&query, &reference, &score_opts)?;

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(if fast_format { "score.blink" } else { "score.tsv" }));
    if output_path.exists() && !args.force {
        log::warn!(
            "output {} already exists, skipping (pass -f to overwrite)",
            output_path.display()
        );
        return Ok(());
    }

    if fast_format {
        write_result(&result, &output_path)?;
    } else {
        let filter_opts = FilterOptions {
            min_score,
            min_matches,
            good_matches,
            mode: if or_all_four { FilterMode::OrAllFour } else { FilterMode::Network },
        };
        let hits = top_k(filter_hits(&result, &filter_opts), usize::MAX);

        let mut out = std::fs::File::create(&output_path)?;
        writeln!(out, "reference_id\tquery_id\tmzi\tnli\tmzc\tnlc\tscore\tmatches")?;
        for hit in &hits {
            let r = hit.reference as u32;
            let mzi = result.mzi.as_ref().map(|m| m.get(hit.query, r)).unwrap_or(0.0);
            let nli = result.nli.as_ref().map(|m| m.get(hit.query, r)).unwrap_or(0.0);
            let mzc = result.mzc.as_ref().map(|m| m.get(hit.query, r)).unwrap_or(0.0);
            let nlc = result.nlc.as_ref().map(|m| m.get(hit.query, r)).unwrap_or(0.0);
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                hit.reference, hit.query, mzi, nli, mzc, nlc, hit.score, hit.matches
            )?;
        }
    }

    log::info!("Score End. Output to {}", output_path.display());
    Ok(())
}
