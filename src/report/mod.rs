//! Report generation for classification results
//!
//! - **JSON**: machine-readable, one object per query plus a summary
//! - **CSV**: spreadsheet-compatible, one row per query
//!
//! # Usage
//!
//! ```ignore
//! use genrematch::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.json", &outcomes)?;  // JSON
//! report::generate("report.csv", &outcomes)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::batch::{Outcome, QueryOutcome};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, outcomes: &[QueryOutcome]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, outcomes),
        _ => csv::write(&mut file, outcomes),
    }
}

/// Text printed for a query on stdout; `verbose` adds vote counts
pub fn result_line(outcome: &QueryOutcome, verbose: bool) -> String {
    match outcome.outcome {
        Outcome::Guess(ref guess) if verbose => {
            let mut line = format!("{}  {} ({})", outcome.name, guess.primary, guess.primary_votes);
            if let (Some(label), Some(votes)) = (guess.secondary.as_ref(), guess.secondary_votes) {
                line.push_str(&format!(", {} ({})", label, votes));
            }
            line
        }
        Outcome::Guess(ref guess) => format!("{}  {}", outcome.name, guess),
        Outcome::Unknown => format!("{}  unknown", outcome.name),
        Outcome::Failed(ref reason) => format!("{}  error: {}", outcome.name, reason),
    }
}

/// Summary statistics for a batch of results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub guessed: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[QueryOutcome]) -> Self {
        let mut summary = Self::default();
        summary.total = outcomes.len();

        for o in outcomes {
            match o.outcome {
                Outcome::Guess(_) => summary.guessed += 1,
                Outcome::Unknown => summary.unknown += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }

        summary
    }
}
