//! Record normalization
//!
//! This module turns a raw delimited workout export into ordered point records.
//! - Delimiter detected from the header line (`;`, tab, `,`, `|`)
//! - Columns reconciled per field with per-row fallback (see [`crate::columns`])
//! - Decimal commas accepted for location, elevation and distance
//! - Structurally broken rows skipped individually and reported

use std::fs;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::columns::ColumnMap;
use crate::error::ComputeError;
use crate::types::{Field, NormalizeReport, PointRecord, SkippedRow};

/// Delimiters we detect, in tie-break order
const DELIMITER_CANDIDATES: [u8; 4] = [b';', b'\t', b',', b'|'];

/// Cell values treated as missing
const NA_TOKENS: &[&str] = &["nan", "na", "n/a", "null", "none", "-", "--"];

/// Output of one normalization pass
#[derive(Debug, Clone)]
pub struct NormalizedExport {
    /// Points in input row order
    pub points: Vec<PointRecord>,
    pub report: NormalizeReport,
}

/// Normalizer for converting raw exports into point records
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    delimiter: Option<u8>,
}

impl RecordNormalizer {
    /// Create a normalizer that detects the delimiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer with a fixed delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    /// Read and normalize an export from disk
    pub fn normalize_path(&self, path: &Path) -> Result<NormalizedExport, ComputeError> {
        let bytes = fs::read(path).map_err(|e| {
            ComputeError::ParseError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        self.normalize_bytes(&bytes)
    }

    /// Normalize an export held in memory
    pub fn normalize_bytes(&self, raw: &[u8]) -> Result<NormalizedExport, ComputeError> {
        let delimiter = self.delimiter.unwrap_or_else(|| detect_delimiter(raw));

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(raw);

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| ComputeError::ParseError(format!("cannot read header row: {}", e)))?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ComputeError::ParseError("export has no header row".to_string()));
        }

        let columns = ColumnMap::from_headers(headers.iter().map(String::as_str));
        if columns.is_empty() {
            warn!(?headers, "no recognizable workout columns in export");
        }
        let shown_delimiter = (delimiter as char).escape_default().to_string();
        debug!(
            delimiter = %shown_delimiter,
            columns = ?columns.describe(),
            "resolved export columns"
        );

        let mut report = NormalizeReport {
            delimiter: delimiter as char,
            columns: columns.describe(),
            ..Default::default()
        };
        let mut points = Vec::new();

        for (idx, result) in reader.byte_records().enumerate() {
            report.rows_read += 1;
            // header is line 1
            let fallback_line = idx as u64 + 2;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                    skip_row(&mut report, line, e.to_string());
                    continue;
                }
            };

            let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
            let record = match StringRecord::from_byte_record(record) {
                Ok(record) => record,
                Err(e) => {
                    let field = e.utf8_error().field() + 1;
                    skip_row(&mut report, line, format!("invalid UTF-8 in field {}", field));
                    continue;
                }
            };

            points.push(resolve_row(&record, &columns, &mut report));
        }

        report.rows_kept = points.len();

        if points.is_empty() {
            return Err(ComputeError::ParseError(format!(
                "no usable rows ({} read, {} skipped)",
                report.rows_read,
                report.skipped_rows.len()
            )));
        }

        if report.total_fallbacks() > 0 {
            debug!(fallbacks = ?report.fallback_counts, "fields resolved via fallback columns");
        }

        Ok(NormalizedExport { points, report })
    }
}

fn skip_row(report: &mut NormalizeReport, line: u64, reason: String) {
    warn!(line, reason = %reason, "skipping malformed row");
    report.skipped_rows.push(SkippedRow { line, reason });
}

/// Build one point, walking each field's candidates until a usable value turns up
fn resolve_row(record: &StringRecord, columns: &ColumnMap, report: &mut NormalizeReport) -> PointRecord {
    let mut point = PointRecord::default();

    for field in Field::ALL {
        for (rank, candidate) in columns.candidates(field).iter().enumerate() {
            let raw = record.get(candidate.index).unwrap_or("");

            let resolved = if field.is_textual() {
                let text = clean_text(raw);
                let found = text.is_some();
                point.set_text(field, text);
                found
            } else {
                let value = parse_number(raw, field);
                let found = value.is_some();
                point.set_numeric(field, value);
                found
            };

            if resolved {
                if rank > 0 {
                    *report.fallback_counts.entry(field).or_insert(0) += 1;
                }
                break;
            }
        }
    }

    point
}

/// Whether a cell carries no value
pub fn is_missing(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NA_TOKENS.iter().any(|na| s.eq_ignore_ascii_case(na))
}

fn clean_text(raw: &str) -> Option<String> {
    if is_missing(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// Parse a numeric cell, accepting a decimal comma where the field allows it
pub fn parse_number(raw: &str, field: Field) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    let s = raw.trim();
    let value = if field.accepts_decimal_comma() {
        s.replace(',', ".").parse::<f64>().ok()?
    } else {
        s.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}

/// Pick the delimiter that occurs most often in the header line outside quotes
pub fn detect_delimiter(raw: &[u8]) -> u8 {
    let header = raw.split(|b| *b == b'\n').next().unwrap_or_default();

    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for byte in header {
        if *byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = DELIMITER_CANDIDATES.iter().position(|d| d == byte) {
            counts[i] += 1;
        }
    }

    // strictly greater keeps the earlier candidate on ties
    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    DELIMITER_CANDIDATES[best]
}
