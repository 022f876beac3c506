//! Column reconciliation
//!
//! Workout exports do not agree on header names (`hr`, `Heart Rate`,
//! `HR (bpm)`, `avg_power`, `HeartRateBpm`, ...). This module cleans each
//! header and looks for a field keyword inside it, with a short list of words
//! that contain a keyword by accident (`three`, `relative`, `health`). The
//! result is an ordered
//! list of candidate columns for every field. The normalizer walks those
//! candidates row by row, so a sparse primary column can fall back to a
//! secondary one.

use std::collections::BTreeMap;

use crate::types::Field;

/// Keyword set for a field; a header matches when its compact form contains one
fn keywords(field: Field) -> &'static [&'static str] {
    match field {
        Field::Timestamp => &["timestamp", "datetime", "time"],
        Field::Date => &["date"],
        Field::Iso8601 => &["iso8601"],
        Field::HeartRate => &["hr", "heartrate", "pulse"],
        Field::Power => &["power", "watts", "pwr"],
        Field::Cadence => &["cadence", "cad"],
        Field::Latitude => &["latitude", "lat"],
        Field::Longitude => &["longitude", "lon", "lng"],
        Field::Elevation => &["elevation", "altitude", "ele", "alt"],
        Field::Distance => &["distance", "dist"],
        Field::Lap => &["lap"],
        Field::SinceStart => &["sincestart", "elapsed"],
    }
}

/// Words that contain a short keyword without meaning the field
fn exclusions(field: Field) -> &'static [&'static str] {
    match field {
        Field::Timestamp => &["zone", "lap", "moving"],
        Field::Date => &["update"],
        Field::HeartRate => &["hrv", "three", "through", "threshold"],
        Field::Latitude => &["relative", "accumulat", "plat"],
        Field::Elevation => &["health", "accelerat", "select", "telemetry"],
        _ => &[],
    }
}

fn contains_any(compact: &str, words: &[&str]) -> bool {
    words.iter().any(|w| compact.contains(w))
}

fn field_matches(field: Field, compact: &str) -> bool {
    contains_any(compact, keywords(field)) && !contains_any(compact, exclusions(field))
}

/// Clean a raw header for keyword matching.
///
/// Strips a BOM, lower-cases, trims, drops a parenthetical unit suffix such as
/// `(W)` or `(bpm)`, and collapses whitespace and hyphens to single underscores.
pub fn clean_header(raw: &str) -> String {
    let mut name = raw.trim().trim_start_matches('\u{feff}').to_lowercase();

    if let Some(idx) = name.find('(') {
        name.truncate(idx);
    }

    let mut cleaned = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !cleaned.is_empty() {
            cleaned.push('_');
        }
        pending_sep = false;
        cleaned.push(ch);
    }
    cleaned
}

/// Whether a cleaned header belongs to a field.
///
/// Separators are ignored, so `heart_rate` and `heartratebpm` both match. A
/// header that reads as time since start (`elapsed_time`, `time_since_start`)
/// is never a wall-clock or lap column.
pub fn header_matches(field: Field, cleaned: &str) -> bool {
    let compact: String = cleaned.chars().filter(|c| *c != '_').collect();
    if !field_matches(field, &compact) {
        return false;
    }
    match field {
        Field::Timestamp | Field::Date | Field::Iso8601 | Field::Lap => {
            !field_matches(Field::SinceStart, &compact)
        }
        _ => true,
    }
}

/// A source column that can feed a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Column index in the source record
    pub index: usize,
    /// Header as it appeared in the file
    pub header: String,
}

/// Ordered candidate columns for every field
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    candidates: BTreeMap<Field, Vec<Candidate>>,
}

impl ColumnMap {
    /// Build the map from raw headers; candidates keep header order
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut candidates: BTreeMap<Field, Vec<Candidate>> = BTreeMap::new();

        for (index, raw) in headers.into_iter().enumerate() {
            let cleaned = clean_header(raw);
            if cleaned.is_empty() {
                continue;
            }
            for field in Field::ALL {
                if header_matches(field, &cleaned) {
                    candidates.entry(field).or_default().push(Candidate {
                        index,
                        header: raw.trim().trim_start_matches('\u{feff}').to_string(),
                    });
                }
            }
        }

        Self { candidates }
    }

    /// Candidate columns for a field, primary first
    pub fn candidates(&self, field: Field) -> &[Candidate] {
        self.candidates.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Header names per resolved field
    pub fn describe(&self) -> BTreeMap<Field, Vec<String>> {
        self.candidates
            .iter()
            .map(|(field, cands)| (*field, cands.iter().map(|c| c.header.clone()).collect()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
