//! Crate-wide error type.
//!
//! Every core component returns a structured [`BlinkError`] instead of
//! aborting the process; the CLI layer is the only place that turns one
//! of these into an exit code.

use thiserror::Error;

/// Errors produced by the discretization, kernel, and scoring core.
#[derive(Debug, Error)]
pub enum BlinkError {
    #[error("spectrum has peaks but no precursor m/z")]
    MissingPrecursor,

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("stores have incompatible bin widths: {a} vs {b}")]
    IncompatibleBins { a: f64, b: f64 },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("kernel expansion would need {needed} nonzeros, budget is {budget}")]
    ResourceExceeded { needed: u64, budget: u64 },

    #[error("input collection is empty")]
    EmptyInput,

    #[error("output already exists: {0}")]
    OutputExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("base64 decoding error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("archive serialization error: {0}")]
    Encode(#[from] Box<bincode::ErrorKind>),

    #[error("invalid numeric field: {0}")]
    InvalidNumber(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type BlinkResult<T> = Result<T, BlinkError>;
