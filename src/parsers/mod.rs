//! Peak-list readers (§4.7): decode on-disk spectra into [`crate::spectrum::RawSpectrum`].
//!
//! Two formats are supported, selected by the CLI from the input file
//! extension: the Mascot Generic Format (`.mgf`) and mzML. Both readers
//! return structured [`crate::error::BlinkError`]s on malformed input rather
//! than panicking.

pub mod mgf;
pub mod mzml;

pub use mgf::read_mgf;
pub use mzml::{read_mzml, MzmlRead};
