//! Run configuration
//!
//! A [`Config`] is built once at startup (TOML file, then CLI overrides) and
//! passed by reference to the matcher and batch driver. Nothing mutates it
//! during a run.
//!
//! ```toml
//! accuracy = true
//! database = "processed_data/features.csv"
//!
//! [tolerances]
//! spectral_centroid = 0.02
//! bpm = 0.25
//!
//! [extraction]
//! train_duration_secs = 30.0
//! ```

use crate::error::{Error, Result};
use crate::matcher::ToleranceProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_DATABASE_PATH: &str = "processed_data/features.csv";

/// How a query is compared against the database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMethod {
    /// Tolerance-window vote tally with primary/secondary tie-break
    #[default]
    Tally,
}

/// Parameters for the default feature extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// FFT frame length in samples
    pub frame_size: usize,
    /// Samples between frame starts
    pub hop_length: usize,
    /// Energy fraction that defines the roll-off frequency
    pub rolloff_percent: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Centre of the tempo prior
    pub start_bpm: f64,
    /// Audio decoded per training song; `None` decodes the whole file
    pub train_duration_secs: Option<f64>,
    /// Audio decoded per query song; `None` decodes the whole file
    pub query_duration_secs: Option<f64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_length: 512,
            rolloff_percent: 0.85,
            min_bpm: 30.0,
            max_bpm: 300.0,
            start_bpm: 120.0,
            train_duration_secs: Some(30.0),
            query_duration_secs: None,
        }
    }
}

impl ExtractionConfig {
    fn validate(&self) -> Result<()> {
        if self.frame_size < 2 {
            return Err(Error::Config(format!(
                "extraction.frame_size must be at least 2, got {}",
                self.frame_size
            )));
        }
        if self.hop_length == 0 {
            return Err(Error::Config("extraction.hop_length must be > 0".to_string()));
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent <= 1.0) {
            return Err(Error::Config(format!(
                "extraction.rolloff_percent must be in (0, 1], got {}",
                self.rolloff_percent
            )));
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return Err(Error::Config(format!(
                "invalid tempo range [{}, {}]",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.start_bpm <= 0.0 {
            return Err(Error::Config("extraction.start_bpm must be > 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub method: ComparisonMethod,
    /// Debug verbosity
    pub debug: bool,
    /// Accuracy bookkeeping against labels embedded in query names
    pub accuracy: bool,
    /// Persisted reference database
    pub database: PathBuf,
    pub tolerances: ToleranceProfile,
    pub extraction: ExtractionConfig,
    /// Labels learned during training; `None` learns every corpus directory
    pub genres: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: ComparisonMethod::Tally,
            debug: false,
            accuracy: false,
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            tolerances: ToleranceProfile::default(),
            extraction: ExtractionConfig::default(),
            genres: None,
        }
    }
}

impl Config {
    /// Read a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("parse TOML failed: {}", e)))?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Whether a corpus directory name should be learned
    pub fn learns_genre(&self, label: &str) -> bool {
        match &self.genres {
            Some(genres) => genres.iter().any(|g| g == label),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.method, ComparisonMethod::Tally);
        assert!(!config.debug);
        assert!(!config.accuracy);
        assert_eq!(config.database, PathBuf::from("processed_data/features.csv"));
        assert_eq!(config.tolerances, ToleranceProfile::default());
        assert_eq!(config.extraction.frame_size, 2048);
        assert_eq!(config.extraction.hop_length, 512);
        assert_eq!(config.extraction.train_duration_secs, Some(30.0));
        assert_eq!(config.extraction.query_duration_secs, None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml_str(
            r#"
            accuracy = true
            database = "db/songs.csv"

            [tolerances]
            bpm = 0.25

            [extraction]
            hop_length = 256
            "#,
        )
        .unwrap();

        assert!(config.accuracy);
        assert_eq!(config.database, PathBuf::from("db/songs.csv"));
        assert_eq!(config.tolerances.bpm, 0.25);
        // Untouched keys keep their defaults
        assert_eq!(config.tolerances.spectral_centroid, 0.02);
        assert_eq!(config.extraction.hop_length, 256);
        assert_eq!(config.extraction.frame_size, 2048);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = Config::from_toml_str(r#"method = "top_k""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_extraction_rejected() {
        let err = Config::from_toml_str("[extraction]\nhop_length = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err =
            Config::from_toml_str("[extraction]\nmin_bpm = 200.0\nmax_bpm = 100.0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_learns_genre() {
        let mut config = Config::default();
        assert!(config.learns_genre("anything"));

        config.genres = Some(vec!["rock".to_string(), "jazz".to_string()]);
        assert!(config.learns_genre("rock"));
        assert!(!config.learns_genre("pop"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/genrematch.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
