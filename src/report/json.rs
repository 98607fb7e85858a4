//! JSON report: summary plus one object per query

use super::Summary;
use crate::batch::{Outcome, QueryOutcome};
use crate::features::FeatureVector;
use crate::matcher::GenreGuess;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    summary: Summary,
    results: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct Entry<'a> {
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<&'a FeatureVector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guess: Option<&'a GenreGuess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a QueryOutcome> for Entry<'a> {
    fn from(o: &'a QueryOutcome) -> Self {
        let (status, guess, error) = match o.outcome {
            Outcome::Guess(ref g) => ("guessed", Some(g), None),
            Outcome::Unknown => ("unknown", None, None),
            Outcome::Failed(ref reason) => ("failed", None, Some(reason.as_str())),
        };
        Entry {
            name: &o.name,
            status,
            features: o.features.as_ref(),
            guess,
            error,
        }
    }
}

pub fn write<W: Write>(writer: &mut W, outcomes: &[QueryOutcome]) -> io::Result<()> {
    let report = Report {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_outcomes(outcomes),
        results: outcomes.iter().map(Entry::from).collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}
