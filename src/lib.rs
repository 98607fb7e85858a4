//! genrematch - Guess a song's genre from a labeled feature database
//!
//! genrematch describes each song by four numbers (spectral centroid,
//! spectral roll-off, zero-crossing rate and tempo) and guesses the genre of
//! a new song by counting how many labeled songs look "close enough" to it.
//!
//! # Overview
//!
//! Training walks a corpus laid out as `<root>/<genre>/<song>`, extracts the
//! four features from every song and appends them to a plain-text database.
//! Classification extracts the same features from a query song and lets
//! every database record whose four features all fall inside the query's
//! tolerance windows vote for its genre.
//!
//! # Quick Start
//!
//! ```no_run
//! use genrematch::{Database, FeatureVector, Matcher, QueryRecord};
//!
//! let database = Database::open("processed_data/features.csv")?;
//! let query = QueryRecord::new("mystery.wav", FeatureVector::new(2210.0, 4480.0, 0.11, 128.0));
//!
//! match Matcher::default().classify(&query, database.records()) {
//!     Ok(guess) => println!("{}", guess),
//!     Err(genrematch::Error::NoMatchFound) => println!("unknown"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), genrematch::Error>(())
//! ```
//!
//! # Decision Rule
//!
//! | Votes (top, runner-up) | Guess |
//! |------------------------|-------|
//! | 10, 5 | top, runner-up |
//! | 10, 4 | top |
//! | no votes | unknown |
//!
//! # Modules
//!
//! - [`features`]: decoding and feature extraction
//! - [`database`]: the persisted record store and query files
//! - [`matcher`]: tolerance windows, vote tally and decision
//! - [`accuracy`]: scoring guesses against labels in file names
//! - [`batch`]: training and classification over many files
//! - [`report`]: output formatters (JSON, CSV)

pub mod accuracy;
pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod features;
pub mod matcher;
pub mod report;

pub use accuracy::AccuracyBook;
pub use config::{ComparisonMethod, Config, ExtractionConfig};
pub use database::{Database, LabeledRecord, QueryRecord};
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureVector, SpectralExtractor};
pub use matcher::{GenreGuess, GenreRanking, Matcher, ToleranceProfile};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate
    // root and wires together end to end.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _ = Config::default();
        let _ = ToleranceProfile::default();
        let _ = AccuracyBook::new();
        let _ = SpectralExtractor::new(ExtractionConfig::default());
        let _: ComparisonMethod = ComparisonMethod::Tally;
    }

    #[test]
    fn test_classify_from_crate_root() {
        let features = FeatureVector::new(2200.0, 4500.0, 0.11, 130.0);
        let database = Database::from_records(vec![
            LabeledRecord::new("rock", "00000", features),
            LabeledRecord::new("rock", "00001", features),
            LabeledRecord::new("pop", "00000", features),
        ]);
        let query = QueryRecord::new("rock.00099.wav", features);

        let guess = Matcher::default().classify(&query, database.records()).unwrap();
        assert_eq!(guess.primary, "rock");
        assert_eq!(guess.primary_votes, 2);
        assert_eq!(guess.secondary.as_deref(), Some("pop"));
    }

    #[test]
    fn test_no_match_on_empty_database() {
        let database = Database::from_records(vec![]);
        let query = QueryRecord::new("q.wav", FeatureVector::new(1.0, 1.0, 0.1, 100.0));
        let err = Matcher::default().classify(&query, database.records()).unwrap_err();
        assert!(matches!(err, Error::NoMatchFound));
    }
}
