use chrono::Local;
use clap::{Parser, Subcommand};
use genrematch::batch::{self, CorpusFilter, QueryOutcome};
use genrematch::database::{self, QueryRecord};
use genrematch::{report, ComparisonMethod, Config, Database, Matcher, SpectralExtractor};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "genrematch")]
#[command(
    author,
    version,
    about = "Guess a song's genre by matching audio features against a labeled database"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Feature database (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Show debug logging and vote counts
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors and the summary
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Score guesses against genre labels in file names
    #[arg(long, global = true)]
    accuracy: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Spectral centroid tolerance (fraction of the query value)
    #[arg(long, global = true, allow_negative_numbers = true)]
    tolerance_centroid: Option<f64>,

    /// Spectral roll-off tolerance
    #[arg(long, global = true, allow_negative_numbers = true)]
    tolerance_rolloff: Option<f64>,

    /// Zero-crossing rate tolerance
    #[arg(long, global = true, allow_negative_numbers = true)]
    tolerance_zcr: Option<f64>,

    /// Tempo tolerance
    #[arg(long, global = true, allow_negative_numbers = true)]
    tolerance_bpm: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Learn a labeled corpus laid out as <corpus>/<genre>/<song>
    Train {
        /// Corpus root directory
        corpus: PathBuf,

        /// Only learn this genre
        #[arg(short, long)]
        genre: Option<String>,

        /// Only learn this song id within --genre
        #[arg(long, requires = "genre")]
        id: Option<String>,
    },

    /// Guess the genre of audio files or precomputed feature rows
    Classify {
        /// File or directory to classify
        #[arg(required_unless_present = "features")]
        path: Option<PathBuf>,

        /// Classify precomputed `name,c,r,z,bpm` rows instead of audio
        #[arg(long, conflicts_with = "path")]
        features: Option<PathBuf>,

        /// Output report file (.csv, .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for auto-generated reports
        #[arg(long, default_value = "genrematch-reports")]
        report_dir: PathBuf,

        /// Don't auto-generate CSV report
        #[arg(long)]
        no_report: bool,

        /// Append extracted query features to this file
        #[arg(long)]
        features_out: Option<PathBuf>,
    },

    /// Extract query features without classifying
    Extract {
        /// File or directory to analyze
        path: PathBuf,

        /// Append rows to this file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.debug, args.quiet);

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let result = match args.command {
        Command::Train { ref corpus, ref genre, ref id } => {
            let filter = CorpusFilter {
                genre: genre.clone(),
                id: id.clone(),
            };
            run_train(&config, corpus, &filter, args.quiet)
        }
        Command::Classify {
            ref path,
            ref features,
            ref output,
            ref report_dir,
            no_report,
            ref features_out,
        } => {
            let report_path = if let Some(output) = output {
                Some(output.clone())
            } else if !no_report {
                let timestamp = Local::now().format("%Y%m%d_%H%M%S");
                Some(report_dir.join(format!("genrematch_report_{}.csv", timestamp)))
            } else {
                None
            };
            let source = match (path, features) {
                (_, Some(rows)) => Ok(QuerySource::Rows(rows)),
                (Some(path), None) => Ok(QuerySource::Audio(path)),
                (None, None) => Err(genrematch::Error::Config(
                    "classify needs a path or --features".to_string(),
                )),
            };
            source.and_then(|source| {
                run_classify(
                    &config,
                    source,
                    report_path.as_deref(),
                    features_out.as_deref(),
                    args.quiet,
                )
            })
        }
        Command::Extract { ref path, ref output } => {
            run_extract(&config, path, output.as_deref(), args.quiet)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Config file (if any) with CLI flags layered on top
fn build_config(args: &Args) -> genrematch::Result<Config> {
    let mut config = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };

    config.debug |= args.verbose;
    config.accuracy |= args.accuracy;
    if let Some(ref db) = args.database {
        config.database = db.clone();
    }

    let overrides = [
        (args.tolerance_centroid, &mut config.tolerances.spectral_centroid),
        (args.tolerance_rolloff, &mut config.tolerances.spectral_rolloff),
        (args.tolerance_zcr, &mut config.tolerances.zero_crossing_rate),
        (args.tolerance_bpm, &mut config.tolerances.bpm),
    ];
    for (value, slot) in overrides {
        if let Some(v) = value {
            *slot = v;
        }
    }

    Ok(config)
}

/// Logs go to stderr; results go to stdout
fn init_logging(debug: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if debug {
        EnvFilter::new("warn,genrematch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,genrematch=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(len: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet || len <= 1 {
        return None;
    }
    let pb = ProgressBar::new(len as u64);
    let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("=>-"));
    }
    Some(pb)
}

fn run_train(
    config: &Config,
    corpus: &Path,
    filter: &CorpusFilter,
    quiet: bool,
) -> genrematch::Result<i32> {
    let samples = batch::discover_corpus(corpus, config, filter)?;
    if samples.is_empty() {
        eprintln!("No songs found under {} (expected <corpus>/<genre>/<song>)", corpus.display());
        return Ok(1);
    }

    if !quiet {
        eprintln!("\x1b[1mgenrematch - training\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} song(s)\n", samples.len());
    }

    let extractor = SpectralExtractor::for_training(&config.extraction);
    let pb = progress_bar(samples.len(), quiet);
    let run = batch::train(&samples, &extractor, pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let written = Database::append(&config.database, &run.records)?;
    info!(database = %config.database.display(), written, "appended records");

    if !quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  Learned: {}", written);
        if !run.failures.is_empty() {
            eprintln!("  \x1b[90mFailed:\x1b[0m  {}", run.failures.len());
        }
        eprintln!("\n\x1b[32mDatabase: {}\x1b[0m", config.database.display());
    }

    Ok(0)
}

enum QuerySource<'a> {
    Audio(&'a Path),
    Rows(&'a Path),
}

fn run_classify(
    config: &Config,
    source: QuerySource<'_>,
    report_path: Option<&Path>,
    features_out: Option<&Path>,
    quiet: bool,
) -> genrematch::Result<i32> {
    // Structural failures surface before any query is processed
    let database = Database::open(&config.database)?;
    if database.is_empty() {
        warn!(
            database = %config.database.display(),
            "database has no records; every query will be unknown"
        );
    } else {
        info!(
            records = database.len(),
            genres = database.labels().len(),
            "loaded database"
        );
    }

    let matcher = match config.method {
        ComparisonMethod::Tally => Matcher::new(config.tolerances),
    };

    let outcomes: Vec<QueryOutcome> = match source {
        QuerySource::Rows(path) => {
            let loaded = database::load_queries(path)?;
            loaded
                .records
                .par_iter()
                .map(|query| batch::classify_one(query, &database, &matcher))
                .collect()
        }
        QuerySource::Audio(path) => {
            let files = batch::collect_audio_files(path)?;
            if files.is_empty() {
                eprintln!("No audio files found under {}", path.display());
                return Ok(1);
            }
            if !quiet {
                eprintln!("\x1b[1mgenrematch - classifying\x1b[0m");
                eprintln!("{}", "─".repeat(70));
                eprintln!("Found {} audio file(s)\n", files.len());
            }

            let extractor = SpectralExtractor::for_queries(&config.extraction);
            let pb = progress_bar(files.len(), quiet);
            let extracted = batch::extract_queries(&files, &extractor, pb.as_ref());
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            if let Some(out) = features_out {
                let rows: Vec<QueryRecord> = extracted
                    .iter()
                    .filter_map(|(_, r)| r.as_ref().ok().cloned())
                    .collect();
                database::append_queries(out, &rows)?;
            }

            batch::classify_all(extracted, &database, &matcher)
        }
    };

    if !quiet {
        for o in &outcomes {
            println!("{}", report::result_line(o, config.debug));
        }
    }

    let summary = report::Summary::from_outcomes(&outcomes);
    if !quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[32mGuessed:\x1b[0m {}", summary.guessed);
        eprintln!("  \x1b[33mUnknown:\x1b[0m {}", summary.unknown);
        if summary.failed > 0 {
            eprintln!("  \x1b[90mFailed:\x1b[0m  {}", summary.failed);
        }
        if !database.skipped().is_empty() {
            eprintln!("  \x1b[90mSkipped database rows:\x1b[0m {}", database.skipped().len());
        }
    }

    if config.accuracy {
        let book = batch::score(&outcomes);
        eprintln!("\n\x1b[1mAccuracy:\x1b[0m");
        for (label, score) in book.scores() {
            eprintln!("  {:<12} {:.1}", label, score);
        }
        eprintln!("  {:<12} {:.1} over {} guess(es)", "total", book.total(), book.evaluated);
        eprintln!("  {:<12} {}", "unknown", book.unknown);
    }

    if let Some(path) = report_path {
        if let Err(e) = report::generate(path, &outcomes) {
            eprintln!("Failed to write report: {}", e);
            return Ok(1);
        }
        if !quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", path.display());
        }
    }

    Ok(0)
}

fn run_extract(
    config: &Config,
    path: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> genrematch::Result<i32> {
    let files = batch::collect_audio_files(path)?;
    if files.is_empty() {
        eprintln!("No audio files found under {}", path.display());
        return Ok(1);
    }

    let extractor = SpectralExtractor::for_queries(&config.extraction);
    let pb = progress_bar(files.len(), quiet);
    let extracted = batch::extract_queries(&files, &extractor, pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let failed = extracted.iter().filter(|(_, r)| r.is_err()).count();
    let rows: Vec<QueryRecord> = extracted.into_iter().filter_map(|(_, r)| r.ok()).collect();

    match output {
        Some(out) => {
            let written = database::append_queries(out, &rows)?;
            if !quiet {
                eprintln!("Wrote {} row(s) to {}", written, out.display());
            }
        }
        None => {
            for row in &rows {
                println!("{}", row.to_row());
            }
        }
    }

    if failed > 0 && !quiet {
        eprintln!("\x1b[90m{} file(s) failed\x1b[0m", failed);
    }
    Ok(0)
}
