//! Tolerance windows
//!
//! A candidate feature value "matches" a reference value when it falls in the
//! closed window `[reference * (1 - r), reference * (1 + r)]`. The arithmetic
//! is applied literally: a negative reference flips the bounds, which leaves an
//! empty window for any `r > 0`. Features are non-negative in practice so this
//! never fires, but it must stay as written for compatibility with existing
//! databases and results.

use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Fractional tolerance per feature
///
/// Values are expected in `(0, 1]` but are not validated; anything else just
/// produces a degenerate window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceProfile {
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    pub bpm: f64,
}

impl Default for ToleranceProfile {
    fn default() -> Self {
        Self {
            spectral_centroid: 0.02,
            spectral_rolloff: 0.11,
            zero_crossing_rate: 0.2,
            bpm: 0.2,
        }
    }
}

/// True iff `candidate` lies in `[reference * (1 - r), reference * (1 + r)]`
pub fn within(reference: f64, candidate: f64, r: f64) -> bool {
    let lower = reference * (1.0 - r);
    let upper = reference * (1.0 + r);
    lower <= candidate && candidate <= upper
}

/// A database record matches a query only if all four features are within
/// tolerance of the query's values.
pub fn is_match(
    query: &FeatureVector,
    candidate: &FeatureVector,
    tolerances: &ToleranceProfile,
) -> bool {
    within(query.spectral_centroid, candidate.spectral_centroid, tolerances.spectral_centroid)
        && within(query.spectral_rolloff, candidate.spectral_rolloff, tolerances.spectral_rolloff)
        && within(
            query.zero_crossing_rate,
            candidate.zero_crossing_rate,
            tolerances.zero_crossing_rate,
        )
        && within(query.bpm, candidate.bpm, tolerances.bpm)
}
