//! Primary / secondary genre selection
//!
//! The top-ranked label is always the primary guess. The runner-up is reported
//! as a secondary guess when it collected at least half as many votes as the
//! winner. The comparison is `>=`, so `{rock: 10, pop: 5}` reports both.

use super::ranking::GenreRanking;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Runner-up must reach this fraction of the winner's votes
pub const SECONDARY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreGuess {
    pub primary: String,
    pub primary_votes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_votes: Option<u32>,
}

impl GenreGuess {
    /// Primary label followed by the secondary label, if any
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = vec![self.primary.as_str()];
        if let Some(ref secondary) = self.secondary {
            labels.push(secondary);
        }
        labels
    }
}

impl fmt::Display for GenreGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary {
            Some(ref secondary) => write!(f, "{}, {}", self.primary, secondary),
            None => write!(f, "{}", self.primary),
        }
    }
}

/// Turn a ranking into a genre guess
///
/// # Errors
///
/// [`Error::NoMatchFound`] if nothing in the database matched the query.
pub fn decide(ranking: &GenreRanking) -> Result<GenreGuess> {
    let top = ranking.get(0).ok_or(Error::NoMatchFound)?;

    let mut guess = GenreGuess {
        primary: top.label.clone(),
        primary_votes: top.votes,
        secondary: None,
        secondary_votes: None,
    };

    if let Some(runner_up) = ranking.get(1) {
        if f64::from(runner_up.votes) >= SECONDARY_RATIO * f64::from(top.votes) {
            guess.secondary = Some(runner_up.label.clone());
            guess.secondary_votes = Some(runner_up.votes);
        }
    }

    Ok(guess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchTally;

    fn ranking(counts: &[(&str, u32)]) -> GenreRanking {
        let mut tally = MatchTally::new();
        for &(label, votes) in counts {
            tally.add_votes(label, votes);
        }
        tally.into_ranking()
    }

    #[test]
    fn test_runner_up_at_half_is_reported() {
        let guess = decide(&ranking(&[("rock", 10), ("pop", 5)])).unwrap();
        assert_eq!(guess.labels(), vec!["rock", "pop"]);
        assert_eq!(guess.primary_votes, 10);
        assert_eq!(guess.secondary_votes, Some(5));
    }

    #[test]
    fn test_runner_up_below_half_is_dropped() {
        let guess = decide(&ranking(&[("rock", 10), ("pop", 4)])).unwrap();
        assert_eq!(guess.labels(), vec!["rock"]);
        assert_eq!(guess.secondary, None);
        assert_eq!(guess.secondary_votes, None);
    }

    #[test]
    fn test_odd_winner_threshold() {
        // 0.5 * 7 = 3.5: 4 qualifies, 3 does not
        let guess = decide(&ranking(&[("jazz", 7), ("blues", 4)])).unwrap();
        assert_eq!(guess.secondary.as_deref(), Some("blues"));

        let guess = decide(&ranking(&[("jazz", 7), ("blues", 3)])).unwrap();
        assert_eq!(guess.secondary, None);
    }

    #[test]
    fn test_empty_ranking_is_no_match() {
        let err = decide(&GenreRanking::default()).unwrap_err();
        assert!(matches!(err, Error::NoMatchFound));
    }

    #[test]
    fn test_single_candidate_has_no_secondary() {
        for votes in [1, 2, 50] {
            let guess = decide(&ranking(&[("classical", votes)])).unwrap();
            assert_eq!(guess.primary, "classical");
            assert_eq!(guess.primary_votes, votes);
            assert_eq!(guess.secondary, None);
        }
    }

    #[test]
    fn test_only_second_place_is_considered() {
        // Third place never becomes secondary, even when tied with second
        let guess = decide(&ranking(&[("metal", 6), ("rock", 3), ("punk", 3)])).unwrap();
        assert_eq!(guess.labels(), vec!["metal", "rock"]);
    }

    #[test]
    fn test_tied_winners() {
        let guess = decide(&ranking(&[("disco", 4), ("pop", 4)])).unwrap();
        assert_eq!(guess.labels(), vec!["disco", "pop"]);
    }

    #[test]
    fn test_display() {
        let guess = decide(&ranking(&[("rock", 10), ("pop", 5)])).unwrap();
        assert_eq!(guess.to_string(), "rock, pop");

        let guess = decide(&ranking(&[("rock", 10)])).unwrap();
        assert_eq!(guess.to_string(), "rock");
    }
}
