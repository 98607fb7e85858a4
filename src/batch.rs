//! Batch driver
//!
//! Runs the extractor over many files and the matcher over many queries.
//! Every file gets its own result: a corrupt file is logged and reported as a
//! failure while the rest of the batch carries on. Only structural problems
//! (missing input path, unreadable database) stop a run, and those are
//! raised before any work starts.
//!
//! Files are processed in parallel with rayon; results always come back in
//! input order.

use crate::accuracy::AccuracyBook;
use crate::config::Config;
use crate::database::{Database, LabeledRecord, QueryRecord};
use crate::error::{Error, Result};
use crate::features::{decode, FeatureExtractor, FeatureVector};
use crate::matcher::{GenreGuess, Matcher};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

// ============================================================================
// File discovery
// ============================================================================

/// Supported audio files under `path` (or `path` itself), sorted
pub fn collect_audio_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::InputUnavailable(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && decode::is_supported(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

/// Display name of a query file
pub fn query_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One labeled song found in a training corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSample {
    pub label: String,
    pub id: String,
    pub path: PathBuf,
}

impl TrainingSample {
    /// Label from the parent directory, id from the file stem
    ///
    /// `genres/rock/rock.00007.wav` becomes label `rock`, id `00007`. A stem
    /// without the `<label>.` prefix is used whole.
    pub fn from_path(path: &Path) -> Option<Self> {
        let label = path.parent()?.file_name()?.to_str()?.to_string();
        let stem = path.file_stem()?.to_str()?;
        let id = stem
            .strip_prefix(label.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(stem)
            .to_string();

        if label.is_empty() {
            return None;
        }
        Some(Self {
            label,
            id,
            path: path.to_path_buf(),
        })
    }
}

/// Restrict corpus discovery to one genre or one song
#[derive(Debug, Clone, Default)]
pub struct CorpusFilter {
    pub genre: Option<String>,
    pub id: Option<String>,
}

impl CorpusFilter {
    fn accepts(&self, sample: &TrainingSample) -> bool {
        self.genre.as_ref().map_or(true, |g| *g == sample.label)
            && self.id.as_ref().map_or(true, |id| *id == sample.id)
    }
}

/// Find every labeled song under a `<root>/<genre>/<file>` corpus
pub fn discover_corpus(
    root: &Path,
    config: &Config,
    filter: &CorpusFilter,
) -> Result<Vec<TrainingSample>> {
    if !root.is_dir() {
        return Err(Error::InputUnavailable(root.to_path_buf()));
    }

    let samples: Vec<TrainingSample> = collect_audio_files(root)?
        .iter()
        .filter(|p| p.parent() != Some(root))
        .filter_map(|p| TrainingSample::from_path(p))
        .filter(|s| config.learns_genre(&s.label))
        .filter(|s| filter.accepts(s))
        .collect();

    debug!(root = %root.display(), songs = samples.len(), "discovered corpus");
    Ok(samples)
}

// ============================================================================
// Training
// ============================================================================

/// Records extracted from a corpus plus the songs that failed
#[derive(Debug, Default)]
pub struct TrainingRun {
    pub records: Vec<LabeledRecord>,
    pub failures: Vec<Error>,
}

/// Extract every sample; failures are logged and collected, not fatal
pub fn train<E: FeatureExtractor>(
    samples: &[TrainingSample],
    extractor: &E,
    progress: Option<&ProgressBar>,
) -> TrainingRun {
    let results: Vec<Result<LabeledRecord>> = samples
        .par_iter()
        .map(|sample| {
            let result = extractor
                .extract(&sample.path)
                .map(|features| LabeledRecord::new(&sample.label, &sample.id, features));
            if let Err(ref e) = result {
                warn!(genre = %sample.label, id = %sample.id, "unable to load song: {}", e);
            }
            if let Some(pb) = progress {
                pb.inc(1);
                pb.set_message(format!("{}.{}", sample.label, sample.id));
            }
            result
        })
        .collect();

    let mut run = TrainingRun::default();
    for result in results {
        match result {
            Ok(record) => run.records.push(record),
            Err(e) => run.failures.push(e),
        }
    }
    run
}

// ============================================================================
// Classification
// ============================================================================

/// What happened to one query
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Guess(GenreGuess),
    /// Nothing in the database matched
    Unknown,
    /// Features could not be extracted
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub name: String,
    pub features: Option<FeatureVector>,
    pub outcome: Outcome,
}

impl QueryOutcome {
    pub fn guess(&self) -> Option<&GenreGuess> {
        match self.outcome {
            Outcome::Guess(ref g) => Some(g),
            _ => None,
        }
    }
}

/// Extract one query per file, keeping failures in place
pub fn extract_queries<E: FeatureExtractor>(
    files: &[PathBuf],
    extractor: &E,
    progress: Option<&ProgressBar>,
) -> Vec<(String, Result<QueryRecord>)> {
    files
        .par_iter()
        .map(|path| {
            let name = query_name(path);
            let result = extractor
                .extract(path)
                .map(|features| QueryRecord::new(&name, features));
            if let Err(ref e) = result {
                warn!("{}", e);
            }
            if let Some(pb) = progress {
                pb.inc(1);
                pb.set_message(name.clone());
            }
            (name, result)
        })
        .collect()
}

/// Match one query against the database
pub fn classify_one(query: &QueryRecord, database: &Database, matcher: &Matcher) -> QueryOutcome {
    let outcome = match matcher.classify(query, database.records()) {
        Ok(guess) => Outcome::Guess(guess),
        Err(Error::NoMatchFound) => Outcome::Unknown,
        Err(e) => Outcome::Failed(e.to_string()),
    };
    QueryOutcome {
        name: query.name.clone(),
        features: Some(query.features),
        outcome,
    }
}

/// Classify extracted queries; extraction failures pass through as `Failed`
pub fn classify_all(
    extracted: Vec<(String, Result<QueryRecord>)>,
    database: &Database,
    matcher: &Matcher,
) -> Vec<QueryOutcome> {
    extracted
        .into_par_iter()
        .map(|(name, result)| match result {
            Ok(query) => classify_one(&query, database, matcher),
            Err(e) => QueryOutcome {
                name,
                features: None,
                outcome: Outcome::Failed(e.to_string()),
            },
        })
        .collect()
}

/// Accuracy scores over a finished batch (failed files are not counted)
pub fn score(outcomes: &[QueryOutcome]) -> AccuracyBook {
    let mut book = AccuracyBook::new();
    for outcome in outcomes {
        match outcome.outcome {
            Outcome::Guess(ref guess) => book.record(&outcome.name, guess),
            Outcome::Unknown => book.record_unknown(),
            Outcome::Failed(_) => {}
        }
    }
    book
}
