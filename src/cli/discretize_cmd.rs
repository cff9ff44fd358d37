//! `blink discretize` (§4.9): read one or more `.mgf`/`.mzML` inputs and
//! write a single sparse archive.

use crate::archive::write_store;
use crate::cli::config::{resolve, Config};
use crate::discretize::{discretize, DiscretizeOptions};
use crate::error::{BlinkError, BlinkResult};
use crate::parsers::{read_mgf, read_mzml};
use crate::spectrum::RawSpectrum;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct DiscretizeArgs {
    pub files: Vec<PathBuf>,
    pub trim: bool,
    pub dedup: bool,
    pub bin_width: Option<f64>,
    pub intensity_power: Option<f64>,
    pub out_dir: Option<PathBuf>,
    pub force: bool,
    pub config: Option<PathBuf>,
}

fn read_one(path: &Path) -> BlinkResult<Vec<RawSpectrum>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mgf" => read_mgf(path),
        "mzml" => Ok(read_mzml(path)?.spectra),
        other => Err(BlinkError::UnsupportedFormat(other.to_string())),
    }
}

pub fn run(args: DiscretizeArgs) -> BlinkResult<()> {
    if args.files.is_empty() {
        return Err(BlinkError::EmptyInput);
    }

    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?.discretize,
        None => Default::default(),
    };

    let bin_width = resolve(args.bin_width, file_config.bin_width, 0.001);
    let intensity_power = resolve(args.intensity_power, file_config.intensity_power, 0.5);
    let trim = resolve(Some(args.trim), file_config.trim, false);
    let dedup = resolve(Some(args.dedup), file_config.dedup, false);
    let out_dir = args
        .out_dir
        .or_else(|| file_config.out_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut all_spectra = Vec::new();
    let mut file_ids = Vec::with_capacity(args.files.len());
    for path in &args.files {
        log::info!("Discretize Start: {}", path.display());
        let spectra = read_one(path)?;
        file_ids.push(all_spectra.len() as u32 + spectra.len() as u32);
        all_spectra.extend(spectra);
    }

    let output_path = out_dir.join(output_stem(&args.files)).with_extension("blink");
    if output_path.exists() && !args.force {
        log::warn!(
            "output {} already exists, skipping (pass -f to overwrite)",
            output_path.display()
        );
        return Ok(());
    }

    let mut metadata = HashMap::new();
    metadata.insert("source_files".to_string(), args.files.len().to_string());

    let opts = DiscretizeOptions {
        bin_width,
        intensity_power,
        trim_empty: trim,
        remove_duplicates: dedup,
        metadata,
    };
    let mut store = discretize(&all_spectra, &opts)?;
    store.file_ids = file_ids;

    std::fs::create_dir_all(&out_dir)?;
    write_store(&store, &output_path)?;
    log::info!(
        "Discretize End. Output to {} ({} spectra, {} nonzeros)",
        output_path.display(),
        store.size(),
        store.nnz()
    );
    Ok(())
}

fn output_stem(files: &[PathBuf]) -> String {
    files[0]
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch")
        .to_string()
}
