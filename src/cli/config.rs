//! TOML configuration file support (§4.9): lets users keep a batch's options
//! in a file instead of retyping flags. CLI flags always win over a value
//! present in the file.

use crate::error::{BlinkError, BlinkResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discretize: DiscretizeConfig,
    #[serde(default)]
    pub score: ScoreConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscretizeConfig {
    pub bin_width: Option<f64>,
    pub intensity_power: Option<f64>,
    pub trim: Option<bool>,
    pub dedup: Option<bool>,
    pub out_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreConfig {
    pub tolerance: Option<f64>,
    pub mass_diffs: Option<Vec<f64>>,
    pub react_steps: Option<u32>,
    pub min_score: Option<f64>,
    pub min_matches: Option<f64>,
    pub good_matches: Option<f64>,
    pub or_all_four: Option<bool>,
    pub fast_format: Option<bool>,
}

impl Config {
    pub fn from_file(path: &Path) -> BlinkResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BlinkError::Config(e.to_string()))
    }
}

/// CLI-provided value wins; falls back to the config file, then `default`.
pub fn resolve<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}
