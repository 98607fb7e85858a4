//! Acoustic feature extraction
//!
//! Every song is reduced to four numbers:
//!
//! ```text
//! Feature              | Unit | Typical range (GTZAN, 22.05 kHz)
//! ---------------------|------|---------------------------------
//! spectral_centroid    | Hz   | 700 - 4500
//! spectral_rolloff     | Hz   | 1000 - 9000
//! zero_crossing_rate   | -    | 0.02 - 0.25
//! bpm                  | BPM  | 50 - 240
//! ```
//!
//! Matching only ever sees a [`FeatureVector`]; where it came from is up to
//! the [`FeatureExtractor`] in use. [`SpectralExtractor`] is the default one:
//! it decodes the file, slides a Hann-windowed FFT over it and averages the
//! per-frame values from [`spectral`], then runs [`tempo`] over the onset
//! envelope.

pub mod decode;
pub mod spectral;
pub mod tempo;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempo::TempoRange;
use tracing::debug;

/// The acoustic fingerprint of one song
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    pub bpm: f64,
}

impl FeatureVector {
    pub fn new(
        spectral_centroid: f64,
        spectral_rolloff: f64,
        zero_crossing_rate: f64,
        bpm: f64,
    ) -> Self {
        Self {
            spectral_centroid,
            spectral_rolloff,
            zero_crossing_rate,
            bpm,
        }
    }

    /// All four values finite and non-negative
    pub fn is_valid(&self) -> bool {
        self.values().iter().all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Values in database column order
    pub fn values(&self) -> [f64; 4] {
        [
            self.spectral_centroid,
            self.spectral_rolloff,
            self.zero_crossing_rate,
            self.bpm,
        ]
    }
}

/// Turns an audio file into a [`FeatureVector`]
///
/// Implementations must be deterministic for a given file and configuration.
pub trait FeatureExtractor: Sync {
    fn extract(&self, path: &Path) -> Result<FeatureVector>;
}

/// Default extractor: symphonia decoding + FFT features + autocorrelation tempo
#[derive(Debug, Clone)]
pub struct SpectralExtractor {
    config: ExtractionConfig,
    max_duration_secs: Option<f64>,
}

impl SpectralExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            max_duration_secs: None,
        }
    }

    /// Extractor for training songs (decodes `train_duration_secs`)
    pub fn for_training(config: &ExtractionConfig) -> Self {
        Self::new(config.clone()).with_max_duration(config.train_duration_secs)
    }

    /// Extractor for query songs (decodes `query_duration_secs`)
    pub fn for_queries(config: &ExtractionConfig) -> Self {
        Self::new(config.clone()).with_max_duration(config.query_duration_secs)
    }

    pub fn with_max_duration(mut self, secs: Option<f64>) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Compute features from already-decoded mono samples
    ///
    /// Fails with a reason string when the signal is shorter than one frame
    /// or completely silent.
    pub fn analyze_samples(
        &self,
        samples: &[f64],
        sample_rate: u32,
    ) -> std::result::Result<FeatureVector, String> {
        let frame_size = self.config.frame_size;
        let hop = self.config.hop_length;

        if sample_rate == 0 {
            return Err("sample rate is 0".to_string());
        }
        if samples.len() < frame_size {
            return Err(format!(
                "too short: {} samples, need at least {}",
                samples.len(),
                frame_size
            ));
        }
        if samples.iter().all(|&s| s == 0.0) {
            return Err("silent audio".to_string());
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let window = spectral::hanning_window(frame_size);
        let bin_hz = sample_rate as f64 / frame_size as f64;
        let num_bins = frame_size / 2 + 1;

        let num_frames = (samples.len() - frame_size) / hop + 1;
        let mut centroid_sum = 0.0;
        let mut rolloff_sum = 0.0;
        let mut zcr_sum = 0.0;
        let mut onset_envelope = Vec::with_capacity(num_frames);
        let mut previous_log: Option<Vec<f64>> = None;
        let mut buffer = vec![Complex::new(0.0, 0.0); frame_size];
        let mut magnitudes = vec![0.0; num_bins];

        for i in 0..num_frames {
            let start = i * hop;
            let frame = &samples[start..start + frame_size];

            for ((slot, &s), &w) in buffer.iter_mut().zip(frame.iter()).zip(window.iter()) {
                *slot = Complex::new(s * w, 0.0);
            }
            fft.process(&mut buffer);

            for (mag, c) in magnitudes.iter_mut().zip(buffer.iter()) {
                *mag = c.norm();
            }

            centroid_sum += spectral::spectral_centroid(&magnitudes, bin_hz);
            rolloff_sum +=
                spectral::spectral_rolloff(&magnitudes, bin_hz, self.config.rolloff_percent);
            zcr_sum += spectral::zero_crossing_rate(frame);

            let log_mags = spectral::log_magnitudes(&magnitudes);
            let flux = match previous_log {
                Some(ref prev) => spectral::spectral_flux(prev, &log_mags),
                None => 0.0,
            };
            onset_envelope.push(flux);
            previous_log = Some(log_mags);
        }

        let frames = num_frames as f64;
        let frame_rate = sample_rate as f64 / hop as f64;
        let bpm = tempo::estimate_bpm(
            &onset_envelope,
            frame_rate,
            TempoRange {
                min_bpm: self.config.min_bpm,
                max_bpm: self.config.max_bpm,
                start_bpm: self.config.start_bpm,
            },
        );

        let features = FeatureVector::new(
            centroid_sum / frames,
            rolloff_sum / frames,
            zcr_sum / frames,
            bpm,
        );
        if !features.is_valid() {
            return Err(format!("invalid feature values: {:?}", features));
        }
        Ok(features)
    }
}

impl FeatureExtractor for SpectralExtractor {
    fn extract(&self, path: &Path) -> Result<FeatureVector> {
        let audio = decode::decode_file(path, self.max_duration_secs)?;
        debug!(
            path = %path.display(),
            sample_rate = audio.sample_rate,
            seconds = audio.duration_secs(),
            "decoded"
        );
        self.analyze_samples(&audio.samples, audio.sample_rate)
            .map_err(|reason| Error::extraction(path, reason))
    }
}
