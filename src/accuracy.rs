//! Accuracy bookkeeping
//!
//! When training songs are re-classified (or any query whose file name carries
//! its true genre, like GTZAN's `rock.00007.wav`), this tallies how often each
//! label was guessed correctly:
//!
//! - primary guess found in the name, with more than one vote: +1.0
//! - secondary guess found in the name: +0.5
//!
//! Single-vote primary wins are ignored because one matching record says
//! little about the genre. The scores never feed back into matching.

use crate::matcher::GenreGuess;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PRIMARY_CREDIT: f64 = 1.0;
pub const SECONDARY_CREDIT: f64 = 0.5;

/// Per-label correctness scores for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyBook {
    scores: BTreeMap<String, f64>,
    /// Queries that produced a guess
    pub evaluated: usize,
    /// Queries with no matching record
    pub unknown: usize,
}

impl AccuracyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one guess against the query's name
    pub fn record(&mut self, query_name: &str, guess: &GenreGuess) {
        self.evaluated += 1;

        if guess.primary_votes > 1 && query_name.contains(guess.primary.as_str()) {
            *self.scores.entry(guess.primary.clone()).or_insert(0.0) += PRIMARY_CREDIT;
        }

        if let Some(ref secondary) = guess.secondary {
            if query_name.contains(secondary.as_str()) {
                *self.scores.entry(secondary.clone()).or_insert(0.0) += SECONDARY_CREDIT;
            }
        }
    }

    pub fn record_unknown(&mut self) {
        self.unknown += 1;
    }

    /// Score for `label`, 0 if it never scored
    pub fn score(&self, label: &str) -> f64 {
        self.scores.get(label).copied().unwrap_or(0.0)
    }

    /// Labels with a non-zero score, sorted by label
    pub fn scores(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(label, &score)| (label.as_str(), score))
    }

    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(primary: &str, votes: u32, secondary: Option<(&str, u32)>) -> GenreGuess {
        GenreGuess {
            primary: primary.to_string(),
            primary_votes: votes,
            secondary: secondary.map(|(s, _)| s.to_string()),
            secondary_votes: secondary.map(|(_, v)| v),
        }
    }

    #[test]
    fn test_correct_primary() {
        let mut book = AccuracyBook::new();
        book.record("rock.00007.wav", &guess("rock", 3, None));
        assert_eq!(book.score("rock"), 1.0);
        assert_eq!(book.evaluated, 1);
    }

    #[test]
    fn test_wrong_secondary_unchanged() {
        let mut book = AccuracyBook::new();
        book.record("rock.00007.wav", &guess("rock", 3, Some(("country", 2))));
        assert_eq!(book.score("rock"), 1.0);
        assert_eq!(book.score("country"), 0.0);
    }

    #[test]
    fn test_correct_secondary_half_credit() {
        let mut book = AccuracyBook::new();
        book.record("jazz.00012.wav", &guess("blues", 6, Some(("jazz", 4))));
        assert_eq!(book.score("blues"), 0.0);
        assert_eq!(book.score("jazz"), 0.5);
    }

    #[test]
    fn test_single_vote_primary_not_credited() {
        let mut book = AccuracyBook::new();
        book.record("metal.00001.wav", &guess("metal", 1, None));
        assert_eq!(book.score("metal"), 0.0);
        assert_eq!(book.evaluated, 1);
    }

    #[test]
    fn test_substring_match() {
        // "rock" is contained in "punkrock"
        let mut book = AccuracyBook::new();
        book.record("punkrock.00003.wav", &guess("rock", 5, Some(("punkrock", 3))));
        assert_eq!(book.score("rock"), 1.0);
        assert_eq!(book.score("punkrock"), 0.5);

        // "pop" is not contained in "hiphop"
        book.record("hiphop.00004.wav", &guess("pop", 5, None));
        assert_eq!(book.score("pop"), 0.0);
    }

    #[test]
    fn test_accumulates_over_run() {
        let mut book = AccuracyBook::new();
        book.record("rock.00001.wav", &guess("rock", 4, None));
        book.record("rock.00002.wav", &guess("rock", 2, Some(("metal", 1))));
        book.record("metal.00001.wav", &guess("rock", 4, Some(("metal", 2))));
        book.record_unknown();

        assert_eq!(book.score("rock"), 2.0);
        assert_eq!(book.score("metal"), 0.5);
        assert_eq!(book.total(), 2.5);
        assert_eq!(book.evaluated, 3);
        assert_eq!(book.unknown, 1);

        let labels: Vec<&str> = book.scores().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["metal", "rock"]);
    }
}
