//! Frame-level spectral features
//!
//! All functions here work on one analysis frame. The extractor averages them
//! over every frame of a song.
//!
//! ```text
//! Feature              | Frame value
//! ---------------------|------------------------------------------------
//! spectral centroid    | Σ f_k |X_k| / Σ |X_k|            (Hz)
//! spectral roll-off    | lowest f_k with Σ_{j<=k} |X_j|² >= p Σ |X_j|²  (Hz)
//! zero-crossing rate   | sign changes / frame length       (0.0 - 1.0)
//! onset strength       | Σ max(0, log|X_k|(t) - log|X_k|(t-1))
//! ```

/// Gain applied before log compression of magnitudes for onset strength
const LOG_COMPRESSION: f64 = 1000.0;

/// Hanning window function
pub fn hanning_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos())
        })
        .collect()
}

/// Magnitude-weighted mean frequency of a frame, 0 for a silent frame
pub fn spectral_centroid(magnitudes: &[f64], bin_hz: f64) -> f64 {
    let magnitude_sum: f64 = magnitudes.iter().sum();
    if magnitude_sum <= f64::EPSILON {
        return 0.0;
    }

    let weighted_sum: f64 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &mag)| i as f64 * bin_hz * mag)
        .sum();

    weighted_sum / magnitude_sum
}

/// Frequency below which `percent` of the frame's energy lies, 0 for silence
pub fn spectral_rolloff(magnitudes: &[f64], bin_hz: f64, percent: f64) -> f64 {
    let total_energy: f64 = magnitudes.iter().map(|&m| m * m).sum();
    if total_energy <= f64::EPSILON {
        return 0.0;
    }

    let threshold = percent * total_energy;
    let mut cumulative = 0.0;
    for (i, &mag) in magnitudes.iter().enumerate() {
        cumulative += mag * mag;
        if cumulative >= threshold {
            return i as f64 * bin_hz;
        }
    }

    magnitudes.len().saturating_sub(1) as f64 * bin_hz
}

/// Fraction of adjacent sample pairs whose sign differs
pub fn zero_crossing_rate(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

/// Log-compressed magnitudes, the input to [`spectral_flux`]
pub fn log_magnitudes(magnitudes: &[f64]) -> Vec<f64> {
    magnitudes
        .iter()
        .map(|&m| (1.0 + LOG_COMPRESSION * m).ln())
        .collect()
}

/// Half-wave rectified increase in log magnitude between two frames
pub fn spectral_flux(previous: &[f64], current: &[f64]) -> f64 {
    previous
        .iter()
        .zip(current.iter())
        .map(|(&p, &c)| (c - p).max(0.0))
        .sum()
}
