//! Global tempo estimation
//!
//! Finds the dominant beat period of an onset-strength envelope.
//!
//! # Algorithm
//!
//! 1. Remove the envelope's mean so a steady signal has no periodicity.
//! 2. Autocorrelate for every lag whose tempo lies in `[min_bpm, max_bpm]`.
//! 3. Weight each lag by a log-normal prior centred on `start_bpm` with a
//!    one-octave deviation. Without it the autocorrelation cannot tell a beat
//!    from its half or double.
//! 4. Convert the best lag to BPM: `60 * frame_rate / lag`.
//!
//! The result is always a single scalar, never a list of candidates.

use tracing::debug;

/// Standard deviation of the tempo prior in octaves
const PRIOR_OCTAVES: f64 = 1.0;

/// Below this envelope variance there is no pulse to track
const MIN_VARIANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRange {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub start_bpm: f64,
}

/// Log-normal weight of `bpm` around `start_bpm`
pub fn tempo_prior(bpm: f64, start_bpm: f64) -> f64 {
    let octaves = (bpm / start_bpm).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Estimate BPM from an onset envelope sampled at `frame_rate` frames/second
///
/// Returns 0.0 when the envelope is too short for the slowest tempo's lag
/// or carries no pulse at all.
pub fn estimate_bpm(onset_envelope: &[f64], frame_rate: f64, range: TempoRange) -> f64 {
    let n = onset_envelope.len();
    if n < 2 || frame_rate <= 0.0 {
        return 0.0;
    }

    let mean = onset_envelope.iter().sum::<f64>() / n as f64;
    let centred: Vec<f64> = onset_envelope.iter().map(|&v| v - mean).collect();
    let variance = centred.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if variance < MIN_VARIANCE {
        debug!(frames = n, "flat onset envelope, no tempo");
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / range.max_bpm).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / range.min_bpm).ceil() as usize).min(n - 1);
    if min_lag > max_lag {
        return 0.0;
    }

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        let acf: f64 = centred[..n - lag]
            .iter()
            .zip(centred[lag..].iter())
            .map(|(a, b)| a * b)
            .sum();
        let bpm = 60.0 * frame_rate / lag as f64;
        let score = acf * tempo_prior(bpm, range.start_bpm);

        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    match best {
        Some((lag, score)) if score > 0.0 => {
            let bpm = 60.0 * frame_rate / lag as f64;
            debug!(lag, bpm, "tempo estimated");
            bpm
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: TempoRange = TempoRange {
        min_bpm: 30.0,
        max_bpm: 300.0,
        start_bpm: 120.0,
    };

    fn pulse_train(len: usize, period: usize) -> Vec<f64> {
        (0..len).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_prior_peaks_at_start() {
        assert!((tempo_prior(120.0, 120.0) - 1.0).abs() < 1e-12);
        assert!(tempo_prior(60.0, 120.0) < 1.0);
        // One octave either side weighs the same
        assert!((tempo_prior(60.0, 120.0) - tempo_prior(240.0, 120.0)).abs() < 1e-12);
    }

    #[test]
    fn test_pulse_train_120() {
        // 50 frames/s, beat every 25 frames = 120 BPM
        let env = pulse_train(1000, 25);
        let bpm = estimate_bpm(&env, 50.0, RANGE);
        assert!((bpm - 120.0).abs() < 1e-9, "got {}", bpm);
    }

    #[test]
    fn test_pulse_train_90() {
        // 45 frames/s, beat every 30 frames = 90 BPM
        let env = pulse_train(1350, 30);
        let bpm = estimate_bpm(&env, 45.0, RANGE);
        assert!((bpm - 90.0).abs() < 1e-9, "got {}", bpm);
    }

    #[test]
    fn test_flat_envelope_has_no_tempo() {
        assert_eq!(estimate_bpm(&vec![0.3; 500], 43.0, RANGE), 0.0);
        assert_eq!(estimate_bpm(&vec![0.0; 500], 43.0, RANGE), 0.0);
    }

    #[test]
    fn test_short_envelope() {
        assert_eq!(estimate_bpm(&[], 43.0, RANGE), 0.0);
        assert_eq!(estimate_bpm(&[1.0], 43.0, RANGE), 0.0);
    }

    #[test]
    fn test_result_within_range() {
        let env = pulse_train(2000, 7);
        let bpm = estimate_bpm(&env, 43.07, RANGE);
        assert!(bpm >= RANGE.min_bpm && bpm <= RANGE.max_bpm + 1e-9 || bpm == 0.0);
    }
}
