//! Genre matching
//!
//! Matches a query song's features against every labeled record in the
//! database and turns the result into a genre guess.
//!
//! # How Matching Works
//!
//! 1. **Tolerance windows**: each of the four features gets a fractional band
//!    around the query's value. A record value inside the band passes.
//!
//! ```text
//! Feature              | Default | Window around a query value q
//! ---------------------|---------|------------------------------
//! spectral_centroid    | 0.02    | [0.98 q, 1.02 q]
//! spectral_rolloff     | 0.11    | [0.89 q, 1.11 q]
//! zero_crossing_rate   | 0.20    | [0.80 q, 1.20 q]
//! bpm                  | 0.20    | [0.80 q, 1.20 q]
//! ```
//!
//! 2. **Votes**: a record whose four features all pass casts one vote for its
//!    label. There is no partial credit.
//!
//! 3. **Ranking**: labels sorted by votes, ties in first-vote order.
//!
//! 4. **Decision**: the winner is the primary genre; the runner-up is added as
//!    a secondary genre when it has at least half the winner's votes.
//!
//! The whole pass is a linear scan with no shared state, so one loaded
//! database can serve any number of queries in parallel.

pub mod decision;
pub mod ranking;
pub mod tolerance;

pub use decision::{decide, GenreGuess, SECONDARY_RATIO};
pub use ranking::{tally, GenreRanking, MatchTally, RankedGenre};
pub use tolerance::{is_match, within, ToleranceProfile};

use crate::database::{LabeledRecord, QueryRecord};
use crate::error::Result;
use tracing::debug;

/// Tally-and-tie-break matcher over a fixed tolerance profile
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    tolerances: ToleranceProfile,
}

impl Matcher {
    pub fn new(tolerances: ToleranceProfile) -> Self {
        Self { tolerances }
    }

    /// Rank every label in `records` by how many of its songs match `query`
    pub fn rank(&self, query: &QueryRecord, records: &[LabeledRecord]) -> GenreRanking {
        let tally = tally(&query.features, records, &self.tolerances);
        debug!(
            query = %query.name,
            labels = tally.len(),
            votes = tally.total_votes(),
            "tallied matches"
        );
        tally.into_ranking()
    }

    /// Rank and decide in one step
    ///
    /// # Errors
    ///
    /// [`crate::Error::NoMatchFound`] when no record matched.
    pub fn classify(&self, query: &QueryRecord, records: &[LabeledRecord]) -> Result<GenreGuess> {
        decide(&self.rank(query, records))
    }
}
