//! Reference database and query feature files
//!
//! Both are plain comma-separated text, one song per line, no header:
//!
//! ```text
//! database:  label,id,spectral_centroid,spectral_rolloff,zero_crossing_rate,bpm
//! queries:   name,spectral_centroid,spectral_rolloff,zero_crossing_rate,bpm
//! ```
//!
//! Rows that cannot be parsed are skipped with a warning and reported back to
//! the caller; they never reach the matcher.

use crate::error::{Error, Result};
use crate::features::FeatureVector;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATABASE_FIELDS: usize = 6;
const QUERY_FIELDS: usize = 5;

// ============================================================================
// Records
// ============================================================================

/// One labeled training song
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRecord {
    pub label: String,
    pub id: String,
    pub features: FeatureVector,
}

impl LabeledRecord {
    pub fn new(label: &str, id: &str, features: FeatureVector) -> Self {
        Self {
            label: label.to_string(),
            id: id.to_string(),
            features,
        }
    }

    pub fn to_row(&self) -> String {
        let mut fields = vec![quote_field(&self.label), quote_field(&self.id)];
        fields.extend(self.features.values().iter().map(|v| v.to_string()));
        fields.join(",")
    }

    /// Parse one database line (`line` is 1-based, for diagnostics)
    pub fn from_row(row: &str, line: usize) -> Result<Self> {
        let fields = split_row(row).map_err(|reason| Error::MalformedRecord { line, reason })?;
        if fields.len() != DATABASE_FIELDS {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("expected {} fields, found {}", DATABASE_FIELDS, fields.len()),
            });
        }
        if fields[0].is_empty() {
            return Err(Error::MalformedRecord {
                line,
                reason: "empty label".to_string(),
            });
        }
        let features = parse_features(&fields[2..], line)?;
        Ok(Self {
            label: fields[0].clone(),
            id: fields[1].clone(),
            features,
        })
    }
}

/// One song being classified
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    pub name: String,
    pub features: FeatureVector,
}

impl QueryRecord {
    pub fn new(name: &str, features: FeatureVector) -> Self {
        Self {
            name: name.to_string(),
            features,
        }
    }

    pub fn to_row(&self) -> String {
        let mut fields = vec![quote_field(&self.name)];
        fields.extend(self.features.values().iter().map(|v| v.to_string()));
        fields.join(",")
    }

    pub fn from_row(row: &str, line: usize) -> Result<Self> {
        let fields = split_row(row).map_err(|reason| Error::MalformedRecord { line, reason })?;
        if fields.len() != QUERY_FIELDS {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("expected {} fields, found {}", QUERY_FIELDS, fields.len()),
            });
        }
        let features = parse_features(&fields[1..], line)?;
        Ok(Self {
            name: fields[0].clone(),
            features,
        })
    }
}

fn parse_features(fields: &[String], line: usize) -> Result<FeatureVector> {
    const NAMES: [&str; 4] = ["spectral_centroid", "spectral_rolloff", "zero_crossing_rate", "bpm"];

    let mut values = [0.0f64; 4];
    for (i, (field, name)) in fields.iter().zip(NAMES.iter()).enumerate() {
        values[i] = field.parse::<f64>().map_err(|_| Error::MalformedRecord {
            line,
            reason: format!("{} is not a number: {:?}", name, field),
        })?;
    }

    let features = FeatureVector::new(values[0], values[1], values[2], values[3]);
    if !features.is_valid() {
        return Err(Error::MalformedRecord {
            line,
            reason: "feature values must be finite and non-negative".to_string(),
        });
    }
    Ok(features)
}

// ============================================================================
// Row codec
// ============================================================================

fn quote_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split a line on commas, honouring double-quoted fields
fn split_row(row: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' if current.trim().is_empty() && !quoted => {
                    current.clear();
                    quoted = true;
                    in_quotes = true;
                }
                ',' => {
                    fields.push(finish_field(&current, quoted));
                    current.clear();
                    quoted = false;
                }
                _ => current.push(c),
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(finish_field(&current, quoted));
    Ok(fields)
}

fn finish_field(value: &str, quoted: bool) -> String {
    if quoted {
        value.to_string()
    } else {
        value.trim().to_string()
    }
}

// ============================================================================
// Loading and appending
// ============================================================================

/// Parsed rows plus the ones that were skipped
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    /// Always [`Error::MalformedRecord`]
    pub skipped: Vec<Error>,
}

fn parse_rows<R, T, F>(reader: R, parse: F) -> Result<Loaded<T>>
where
    R: BufRead,
    F: Fn(&str, usize) -> Result<T>,
{
    let mut loaded = Loaded {
        records: Vec::new(),
        skipped: Vec::new(),
    };

    for (i, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        let line_no = i + 1;
        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(_) => {
                let e = Error::MalformedRecord {
                    line: line_no,
                    reason: "invalid UTF-8".to_string(),
                };
                warn!("skipping row: {}", e);
                loaded.skipped.push(e);
                continue;
            }
        };
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        match parse(line, line_no) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                warn!("skipping row: {}", e);
                loaded.skipped.push(e);
            }
        }
    }

    Ok(loaded)
}

fn append_rows<I>(path: &Path, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = String>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for row in rows {
        writeln!(writer, "{}", row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// The labeled reference database, loaded once and read-only afterwards
#[derive(Debug, Default)]
pub struct Database {
    path: Option<PathBuf>,
    records: Vec<LabeledRecord>,
    skipped: Vec<Error>,
}

impl Database {
    /// Load the database file
    ///
    /// # Errors
    ///
    /// [`Error::DatabaseUnavailable`] if the file cannot be opened or read.
    /// Malformed rows are not errors; see [`Database::skipped`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| Error::DatabaseUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let loaded = parse_rows(BufReader::new(file), LabeledRecord::from_row).map_err(|e| match e {
            Error::Io(source) => unavailable(source),
            other => other,
        })?;

        info!(
            path = %path.display(),
            records = loaded.records.len(),
            skipped = loaded.skipped.len(),
            "loaded database"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            records: loaded.records,
            skipped: loaded.skipped,
        })
    }

    /// Parse a database from any reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let loaded = parse_rows(reader, LabeledRecord::from_row)?;
        Ok(Self {
            path: None,
            records: loaded.records,
            skipped: loaded.skipped,
        })
    }

    pub fn from_records(records: Vec<LabeledRecord>) -> Self {
        Self {
            path: None,
            records,
            skipped: Vec::new(),
        }
    }

    /// Append records to a database file, creating it if needed
    pub fn append<P: AsRef<Path>>(path: P, records: &[LabeledRecord]) -> Result<usize> {
        let path = path.as_ref();
        let count = append_rows(path, records.iter().map(LabeledRecord::to_row))?;
        debug!(path = %path.display(), count, "appended records");
        Ok(count)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    /// Rows dropped while loading
    pub fn skipped(&self) -> &[Error] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct labels in first-appearance order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for record in &self.records {
            if !labels.contains(&record.label.as_str()) {
                labels.push(&record.label);
            }
        }
        labels
    }
}

/// Load precomputed query rows
pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<Loaded<QueryRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::InputUnavailable(path.to_path_buf()));
    }
    let file = File::open(path)?;
    parse_rows(BufReader::new(file), QueryRecord::from_row)
}

/// Append extracted query rows, e.g. to keep a features file for later runs
pub fn append_queries<P: AsRef<Path>>(path: P, queries: &[QueryRecord]) -> Result<usize> {
    append_rows(path.as_ref(), queries.iter().map(QueryRecord::to_row))
}
