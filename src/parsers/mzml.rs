//! mzML reader (§4.7): a streaming `quick-xml` parser that yields only
//! MS level >= 2 spectra, decoding the m/z and intensity binary data arrays
//! and the selected-precursor m/z.
//!
//! MS^n spectra record their parent via `precursor/@spectrumRef`; since the
//! discretizer only ever consumes a flat `(peaks, precursor_mz)` list, that
//! chain is exposed separately as [`MzmlRead::parent_of`] rather than folded
//! into [`RawSpectrum`].

use crate::error::{BlinkError, BlinkResult};
use crate::spectrum::RawSpectrum;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::path::Path;
use std::str;

const MS_LEVEL: &str = "MS:1000511";
const MZ_ARRAY: &str = "MS:1000514";
const INTENSITY_ARRAY: &str = "MS:1000515";
const FLOAT_64: &str = "MS:1000523";
const FLOAT_32: &str = "MS:1000521";
const ZLIB_COMPRESSION: &str = "MS:1000576";
const SELECTED_ION_MZ: &str = "MS:1000744";

/// Everything a whole-file mzML read produces.
#[derive(Debug, Default)]
pub struct MzmlRead {
    pub spectra: Vec<RawSpectrum>,
    /// Maps an MS^n spectrum's id to the spectrum id its `<precursor
    /// spectrumRef="...">` points at.
    pub parent_of: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArrayKind {
    Mz,
    Intensity,
    Other,
}

struct DecodedArray {
    kind: ArrayKind,
    values: Vec<f64>,
}

#[derive(Default)]
struct PendingSpectrum {
    id: String,
    ms_level: Option<i32>,
    arrays: Vec<DecodedArray>,
    precursor_mz: Option<f64>,
    precursor_ref: Option<String>,
}

pub fn read_mzml(path: impl AsRef<Path>) -> BlinkResult<MzmlRead> {
    let file = std::fs::File::open(path)?;
    let buffered = std::io::BufReader::new(file);
    let mut xml = Reader::from_reader(buffered);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut out = MzmlRead::default();
    let mut in_spectrum = false;
    let mut current: Option<PendingSpectrum> = None;

    loop {
        match xml.read_event_into(&mut buf).map_err(|e| BlinkError::Xml(e.to_string()))? {
            Event::Start(ref e) => {
                let name = local_name(e);
                match name.as_str() {
                    "spectrum" => {
                        in_spectrum = true;
                        current = Some(PendingSpectrum {
                            id: attr(e, "id")?.unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    "cvParam" if in_spectrum => {
                        if let Some(spec) = current.as_mut() {
                            if let Some(accession) = attr(e, "accession")? {
                                if accession == MS_LEVEL {
                                    if let Some(v) = attr(e, "value")? {
                                        spec.ms_level = v.parse().ok();
                                    }
                                }
                            }
                        }
                    }
                    "binaryDataArray" if in_spectrum => {
                        let array = parse_binary_data_array(&mut xml)?;
                        if let Some(spec) = current.as_mut() {
                            spec.arrays.push(array);
                        }
                    }
                    "precursor" if in_spectrum => {
                        let spectrum_ref = attr(e, "spectrumRef")?;
                        let mz = parse_precursor(&mut xml)?;
                        if let Some(spec) = current.as_mut() {
                            spec.precursor_mz = mz;
                            spec.precursor_ref = spectrum_ref;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if local_name(e) == "spectrum" && in_spectrum {
                    if let Some(spec) = current.take() {
                        if spec.ms_level.unwrap_or(1) >= 2 {
                            if let Some(parent) = &spec.precursor_ref {
                                out.parent_of.insert(spec.id.clone(), parent.clone());
                            }
                            out.spectra.push(finish_spectrum(spec)?);
                        }
                    }
                    in_spectrum = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn finish_spectrum(spec: PendingSpectrum) -> BlinkResult<RawSpectrum> {
    let mz = spec
        .arrays
        .iter()
        .find(|a| a.kind == ArrayKind::Mz)
        .map(|a| a.values.clone())
        .unwrap_or_default();
    let intensity = spec
        .arrays
        .iter()
        .find(|a| a.kind == ArrayKind::Intensity)
        .map(|a| a.values.clone())
        .unwrap_or_default();
    if mz.len() != intensity.len() {
        return Err(BlinkError::InvalidNumber(format!(
            "spectrum {} has mismatched m/z ({}) and intensity ({}) array lengths",
            spec.id,
            mz.len(),
            intensity.len()
        )));
    }
    Ok(RawSpectrum {
        mz,
        intensity,
        precursor_mz: spec.precursor_mz,
        params: HashMap::new(),
    })
}

fn parse_precursor<B: BufRead>(xml: &mut Reader<B>) -> BlinkResult<Option<f64>> {
    let mut buf = Vec::new();
    let mut mz = None;
    loop {
        match xml.read_event_into(&mut buf).map_err(|e| BlinkError::Xml(e.to_string()))? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if local_name(e) == "cvParam" {
                    if attr(e, "accession")?.as_deref() == Some(SELECTED_ION_MZ) {
                        if let Some(v) = attr(e, "value")? {
                            mz = v.parse().ok();
                        }
                    }
                }
            }
            Event::End(ref e) => {
                if local_name(e) == "precursor" {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(mz)
}

fn parse_binary_data_array<B: BufRead>(xml: &mut Reader<B>) -> BlinkResult<DecodedArray> {
    let mut buf = Vec::new();
    let mut kind = ArrayKind::Other;
    let mut is_f64 = true;
    let mut zlib = false;
    let mut in_binary = false;
    let mut base64_text = String::new();

    loop {
        match xml.read_event_into(&mut buf).map_err(|e| BlinkError::Xml(e.to_string()))? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = local_name(e);
                if name == "cvParam" {
                    if let Some(accession) = attr(e, "accession")? {
                        match accession.as_str() {
                            MZ_ARRAY => kind = ArrayKind::Mz,
                            INTENSITY_ARRAY => kind = ArrayKind::Intensity,
                            FLOAT_64 => is_f64 = true,
                            FLOAT_32 => is_f64 = false,
                            ZLIB_COMPRESSION => zlib = true,
                            _ => {}
                        }
                    }
                } else if name == "binary" {
                    in_binary = true;
                }
            }
            Event::Text(e) => {
                if in_binary {
                    base64_text.push_str(&e.unescape().map_err(|err| BlinkError::Xml(err.to_string()))?);
                }
            }
            Event::End(ref e) => {
                let name = local_name(e);
                if name == "binary" {
                    in_binary = false;
                } else if name == "binaryDataArray" {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let values = decode_binary(base64_text.trim(), is_f64, zlib)?;
    Ok(DecodedArray { kind, values })
}

fn decode_binary(base64_text: &str, is_f64: bool, zlib: bool) -> BlinkResult<Vec<f64>> {
    if base64_text.is_empty() {
        return Ok(Vec::new());
    }
    let raw = BASE64.decode(base64_text)?;
    let bytes = if zlib {
        let mut decoder = flate2::read::ZlibDecoder::new(&raw[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    let chunk_size = if is_f64 { 8 } else { 4 };
    if bytes.len() % chunk_size != 0 {
        return Err(BlinkError::InvalidNumber(format!(
            "binary data array length {} is not a multiple of {}",
            bytes.len(),
            chunk_size
        )));
    }

    let values = bytes
        .chunks_exact(chunk_size)
        .map(|chunk| {
            if is_f64 {
                f64::from_le_bytes(chunk.try_into().unwrap())
            } else {
                f32::from_le_bytes(chunk.try_into().unwrap()) as f64
            }
        })
        .collect();
    Ok(values)
}

fn local_name(e: &BytesStart) -> String {
    let full = str::from_utf8(e.name().into_inner()).unwrap_or("");
    full.rsplit(':').next().unwrap_or(full).to_string()
}

fn attr(e: &BytesStart, key: &str) -> BlinkResult<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| BlinkError::Xml(err.to_string()))?;
        if str::from_utf8(a.key.into_inner()).unwrap_or("") == key {
            return Ok(Some(
                str::from_utf8(&a.value)
                    .map_err(|err| BlinkError::Xml(err.to_string()))?
                    .to_string(),
            ));
        }
    }
    Ok(None)
}
