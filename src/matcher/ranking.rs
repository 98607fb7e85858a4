//! Vote tally and ranking
//!
//! Every database record that matches the query casts one vote for its label.
//! Labels are then ranked by vote count, highest first. Labels with equal
//! counts keep the order in which they first received a vote (database order),
//! so the ranking is fully determined by the database ordering.

use super::tolerance::{is_match, ToleranceProfile};
use crate::database::LabeledRecord;
use crate::features::FeatureVector;
use serde::Serialize;
use std::collections::HashMap;

/// Per-query vote counts, in first-vote order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchTally {
    entries: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl MatchTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `label`
    pub fn vote(&mut self, label: &str) {
        self.add_votes(label, 1);
    }

    pub fn add_votes(&mut self, label: &str, votes: u32) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 += votes,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), votes));
            }
        }
    }

    /// Votes for `label`, 0 if it never matched
    pub fn votes(&self, label: &str) -> u32 {
        self.index.get(label).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct labels with at least one vote
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_votes(&self) -> u32 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    pub fn into_ranking(self) -> GenreRanking {
        let mut entries: Vec<RankedGenre> = self
            .entries
            .into_iter()
            .map(|(label, votes)| RankedGenre { label, votes })
            .collect();
        // sort_by is stable: equal counts stay in first-vote order
        entries.sort_by(|a, b| b.votes.cmp(&a.votes));
        GenreRanking { entries }
    }
}

/// Scan the whole database against one query
pub fn tally(
    query: &FeatureVector,
    records: &[LabeledRecord],
    tolerances: &ToleranceProfile,
) -> MatchTally {
    let mut tally = MatchTally::new();
    for record in records {
        if is_match(query, &record.features, tolerances) {
            tally.vote(&record.label);
        }
    }
    tally
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedGenre {
    pub label: String,
    pub votes: u32,
}

/// Labels ordered by descending vote count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenreRanking {
    entries: Vec<RankedGenre>,
}

impl GenreRanking {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, rank: usize) -> Option<&RankedGenre> {
        self.entries.get(rank)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, id: &str, features: FeatureVector) -> LabeledRecord {
        LabeledRecord::new(label, id, features)
    }

    fn query() -> FeatureVector {
        FeatureVector::new(1000.0, 2000.0, 0.1, 120.0)
    }

    fn near() -> FeatureVector {
        FeatureVector::new(1010.0, 2100.0, 0.11, 125.0)
    }

    fn far() -> FeatureVector {
        FeatureVector::new(3000.0, 6000.0, 0.3, 80.0)
    }

    // ==========================================================================
    // TALLY TESTS
    // ==========================================================================

    #[test]
    fn test_tally_counts_only_matches() {
        let db = vec![
            record("rock", "00001", near()),
            record("rock", "00002", near()),
            record("pop", "00001", near()),
            record("metal", "00001", far()),
        ];

        let tally = tally(&query(), &db, &ToleranceProfile::default());
        assert_eq!(tally.votes("rock"), 2);
        assert_eq!(tally.votes("pop"), 1);
        assert_eq!(tally.votes("metal"), 0);
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.total_votes(), 3);
    }

    #[test]
    fn test_tally_empty_when_nothing_matches() {
        let db = vec![record("metal", "00001", far()), record("jazz", "00002", far())];
        let tally = tally(&query(), &db, &ToleranceProfile::default());
        assert!(tally.is_empty());
        assert!(tally.into_ranking().is_empty());
    }

    #[test]
    fn test_tally_empty_database() {
        let tally = tally(&query(), &[], &ToleranceProfile::default());
        assert!(tally.is_empty());
    }

    #[test]
    fn test_labels_are_opaque() {
        let db = vec![
            record("Rock", "a", near()),
            record("rock", "b", near()),
            record("post-rock / shoegaze", "c", near()),
        ];
        let tally = tally(&query(), &db, &ToleranceProfile::default());
        assert_eq!(tally.len(), 3);
        assert_eq!(tally.votes("Rock"), 1);
        assert_eq!(tally.votes("post-rock / shoegaze"), 1);
    }

    // ==========================================================================
    // RANKING TESTS
    // ==========================================================================

    #[test]
    fn test_ranking_descending() {
        let mut tally = MatchTally::new();
        tally.add_votes("blues", 2);
        tally.add_votes("rock", 10);
        tally.add_votes("pop", 5);

        let ranking = tally.into_ranking();
        let labels: Vec<&str> = ranking.labels().collect();
        assert_eq!(labels, vec!["rock", "pop", "blues"]);
        assert_eq!(ranking.get(0).unwrap().votes, 10);
        assert_eq!(ranking.get(2).unwrap().votes, 2);
    }

    #[test]
    fn test_ties_keep_first_vote_order() {
        let db = vec![
            record("jazz", "1", near()),
            record("blues", "1", near()),
            record("blues", "2", near()),
            record("jazz", "2", near()),
            record("country", "1", near()),
        ];
        let ranking = tally(&query(), &db, &ToleranceProfile::default()).into_ranking();
        let labels: Vec<&str> = ranking.labels().collect();
        assert_eq!(labels, vec!["jazz", "blues", "country"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let db: Vec<LabeledRecord> = (0..50)
            .map(|i| {
                let label = ["rock", "pop", "disco", "reggae"][i % 4];
                let f = if i % 3 == 0 { far() } else { near() };
                record(label, &format!("{:05}", i), f)
            })
            .collect();

        let a = tally(&query(), &db, &ToleranceProfile::default()).into_ranking();
        let b = tally(&query(), &db, &ToleranceProfile::default()).into_ranking();
        assert_eq!(a, b);
    }

    #[test]
    fn test_votes_default_zero() {
        let tally = MatchTally::new();
        assert_eq!(tally.votes("anything"), 0);
        assert_eq!(tally.total_votes(), 0);
    }
}
