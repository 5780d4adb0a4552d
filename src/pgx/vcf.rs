//! Reading of pre-annotated genotype VCF files.
//!
//! Only the first eight columns are interpreted.  Records are expected to
//! carry `GENE` and `STAR` keys in their `INFO` column; records for genes
//! outside of [`Gene`] are dropped.

use std::{path::Path, str::FromStr};

use byte_unit::{Byte, UnitType};
use serde::Serialize;

use crate::{err::ParseError, pgx::conf::Gene};

/// Maximal size of an input file in bytes.
pub const MAX_VCF_SIZE: u64 = 5 * 1024 * 1024;

/// Number of mandatory tab-separated columns of a data line.
const MIN_COLUMNS: usize = 8;

/// One annotated variant record for a target gene.
#[derive(Serialize, Debug, Clone, PartialEq, derive_new::new)]
pub struct VariantRecord {
    /// Chromosome name as written in the file.
    pub chromosome: String,
    /// 1-based position.
    pub position: u64,
    /// The rsID or `chr{chrom}:{pos}` if there is none.
    pub reference_id: String,
    /// Reference allele.
    pub ref_allele: String,
    /// Alternate allele(s).
    pub alt_allele: String,
    /// The annotated gene.
    pub gene: Gene,
    /// The annotated star allele, empty if missing.
    pub star_allele: String,
    /// Variant quality, 0 if unrecorded.
    pub quality: f64,
    /// Value of the `FILTER` column.
    pub filter_status: String,
}

/// Result of parsing one VCF file.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    /// The retained records in file order.
    pub variants: Vec<VariantRecord>,
    /// Value of the `##fileformat` header, if any.
    pub format_version: Option<String>,
    /// Whether any retained record lacked a star allele annotation.
    pub missing_annotations: bool,
    /// Equals `variants.len()`.
    pub total_variants: usize,
}

/// Render a byte count for error messages.
fn human_size(bytes: u64) -> String {
    format!(
        "{:.2}",
        Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary)
    )
}

fn check_size(size: u64) -> Result<(), ParseError> {
    if size > MAX_VCF_SIZE {
        Err(ParseError::SizeLimit {
            size: human_size(size),
            limit: human_size(MAX_VCF_SIZE),
        })
    } else {
        Ok(())
    }
}

/// Parse the VCF file at `path`.
///
/// The size limit is checked before the file contents are read.
pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<ParseResult, ParseError> {
    let path = path.as_ref();
    let metadata =
        std::fs::metadata(path).map_err(|_| ParseError::NotFound(path.display().to_string()))?;
    if !metadata.is_file() {
        return Err(ParseError::NotFound(path.display().to_string()));
    }
    check_size(metadata.len())?;

    tracing::debug!("reading {} ({})", path.display(), human_size(metadata.len()));
    let bytes = std::fs::read(path).map_err(|e| ParseError::Format(e.to_string()))?;
    parse_bytes(&bytes)
}

/// Parse raw file contents.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    check_size(bytes.len() as u64)?;
    let source = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;
    parse_str(source)
}

/// Parse file contents that are known to be valid UTF-8.
pub fn parse_str(source: &str) -> Result<ParseResult, ParseError> {
    let state = source
        .lines()
        .enumerate()
        .try_fold(ParseState::default(), |state, (i, line)| {
            state.consume(i + 1, line)
        })?;

    let result = state.finish();
    tracing::debug!(
        "retained {} pharmacogenomic variants (format version {:?}, missing annotations: {})",
        result.total_variants,
        result.format_version,
        result.missing_annotations
    );
    Ok(result)
}

/// Accumulator threaded through the lines of a file.
#[derive(Debug, Default)]
struct ParseState {
    variants: Vec<VariantRecord>,
    format_version: Option<String>,
    missing_annotations: bool,
}

impl ParseState {
    fn consume(mut self, line_no: usize, line: &str) -> Result<Self, ParseError> {
        let line = line.trim();

        if let Some(meta) = line.strip_prefix("##") {
            if let Some(("fileformat", value)) = meta.split_once('=') {
                self.format_version = Some(value.to_string());
            }
            return Ok(self);
        }
        if line.starts_with("#CHROM") || line.is_empty() {
            return Ok(self);
        }

        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_COLUMNS {
            tracing::trace!("skipping line {} with {} columns", line_no, fields.len());
            return Ok(self);
        }
        let [chrom, pos, id, ref_allele, alt_allele, qual, filter, info] = [
            fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6], fields[7],
        ];

        let annotations = InfoAnnotations::from_info(info);
        let gene = match annotations.gene.map(Gene::from_str) {
            Some(Ok(gene)) => gene,
            _ => return Ok(self),
        };

        let star_allele = annotations.star.unwrap_or_default();
        if star_allele.is_empty() {
            self.missing_annotations = true;
        }

        let position = parse_position(pos).map_err(|msg| line_error(line_no, msg))?;
        let quality = parse_quality(qual).map_err(|msg| line_error(line_no, msg))?;
        let reference_id = if id.is_empty() || id == "." {
            format!("chr{chrom}:{position}")
        } else {
            id.to_string()
        };

        self.variants.push(VariantRecord::new(
            chrom.to_string(),
            position,
            reference_id,
            ref_allele.to_string(),
            alt_allele.to_string(),
            gene,
            star_allele.to_string(),
            quality,
            filter.to_string(),
        ));
        Ok(self)
    }

    fn finish(self) -> ParseResult {
        ParseResult {
            total_variants: self.variants.len(),
            variants: self.variants,
            format_version: self.format_version,
            missing_annotations: self.missing_annotations,
        }
    }
}

/// The `INFO` keys of interest.
#[derive(Debug, Default, PartialEq)]
struct InfoAnnotations<'a> {
    gene: Option<&'a str>,
    star: Option<&'a str>,
}

impl<'a> InfoAnnotations<'a> {
    /// Extract `GENE` and `STAR`; later occurrences win, flags without `=` are ignored.
    fn from_info(info: &'a str) -> Self {
        info.split(';')
            .filter_map(|item| item.split_once('='))
            .fold(Self::default(), |mut result, (key, value)| {
                match key {
                    "GENE" => result.gene = Some(value),
                    "STAR" => result.star = Some(value),
                    _ => (),
                }
                result
            })
    }
}

fn line_error(line_no: usize, msg: String) -> ParseError {
    ParseError::Format(format!("line {line_no}: {msg}"))
}

fn parse_position(pos: &str) -> Result<u64, String> {
    match pos.parse::<u64>() {
        Ok(0) => Err(String::from("position must be 1-based, got 0")),
        Ok(position) => Ok(position),
        Err(e) => Err(format!("invalid position {pos:?}: {e}")),
    }
}

fn parse_quality(qual: &str) -> Result<f64, String> {
    if qual == "." {
        return Ok(0.0);
    }
    match qual.parse::<f64>() {
        Ok(quality) if quality.is_finite() && quality >= 0.0 => Ok(quality),
        Ok(quality) => Err(format!("invalid quality {quality}")),
        Err(e) => Err(format!("invalid quality {qual:?}: {e}")),
    }
}
