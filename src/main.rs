use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rgain::cache;
use rgain::format;
use rgain::models::AlbumReport;
use rgain::track::scan_audio_files;
use rgain::{analyze_album, AnalysisConfig, EmptyAlbumPolicy};

#[derive(Parser)]
#[command(name = "rgain", about = "ReplayGain analyzer for audio albums")]
struct Cli {
    /// An album directory, or the album's audio files in track order
    paths: Vec<String>,

    /// Output as JSON instead of table
    #[arg(long)]
    json: bool,

    /// Output the bare record list (tracks in order, then the album) as JSON
    #[arg(long, conflicts_with = "json")]
    records: bool,

    /// Launch interactive TUI
    #[arg(long)]
    tui: bool,

    /// Re-analyze even if a cached report exists
    #[arg(long)]
    regenerate: bool,

    /// Analyze all immediate subdirectories as separate albums
    #[arg(long)]
    bulk: bool,

    /// Write a text report (rgain_report.txt) alongside JSON
    #[arg(long)]
    txt: bool,

    /// Treat a file as undecodable if probing takes longer than SECS
    #[arg(long, value_name = "SECS")]
    probe_timeout: Option<f64>,

    /// Abandon a track's analysis after SECS
    #[arg(long, value_name = "SECS")]
    track_timeout: Option<f64>,

    /// Fail instead of reporting an empty album when no file is recognized
    #[arg(long)]
    reject_empty: bool,

    /// Log pipeline activity at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        Ok(AnalysisConfig {
            probe_timeout: seconds(self.probe_timeout, "--probe-timeout")?,
            track_timeout: seconds(self.track_timeout, "--track-timeout")?,
            empty_album: if self.reject_empty {
                EmptyAlbumPolicy::Reject
            } else {
                EmptyAlbumPolicy::AggregateOnly
            },
            ..AnalysisConfig::default()
        })
    }
}

fn seconds(value: Option<f64>, flag: &str) -> Result<Option<Duration>> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("{} must be a non-negative number of seconds", flag))
        })
        .transpose()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "rgain=debug" } else { "rgain=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &AlbumReport, cli: &Cli) {
    if cli.records {
        println!("{}", format::format_records_json(&report.records()));
    } else if cli.json {
        println!("{}", format::format_json(report));
    } else {
        println!("{}", format::format_table(report));
    }
}

fn print_benchmark(report: &AlbumReport, total: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let analyzed = report.tracks.len();
    let avg_per_track = if analyzed == 0 {
        0.0
    } else {
        secs / analyzed as f64
    };

    eprintln!(
        "Analyzed {} of {} tracks in {:.2}s | {:.2}s/track",
        analyzed, total, secs, avg_per_track,
    );
}

fn run_bulk(
    base_path: &Path,
    config: &AnalysisConfig,
    write_json: bool,
    write_txt: bool,
    regenerate: bool,
) -> Result<()> {
    let mut subdirs: Vec<_> = std::fs::read_dir(base_path)
        .with_context(|| format!("Failed to read directory: {}", base_path.display()))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if entry.path().is_dir() {
                Some(entry.path())
            } else {
                None
            }
        })
        .collect();

    subdirs.sort();

    if subdirs.is_empty() {
        anyhow::bail!("No subdirectories found in '{}'", base_path.display());
    }

    let total = subdirs.len();
    let mut analyzed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (i, subdir) in subdirs.iter().enumerate() {
        let album_name = subdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| subdir.display().to_string());

        if !regenerate && cache::reports_exist(subdir, write_json, write_txt) {
            eprintln!("[{}/{}] Skipping (reports exist): {}", i + 1, total, album_name);
            skipped += 1;
            continue;
        }

        let files = scan_audio_files(subdir);
        if files.is_empty() {
            eprintln!("[{}/{}] Skipping (no audio files): {}", i + 1, total, album_name);
            skipped += 1;
            continue;
        }

        eprintln!("[{}/{}] Analyzing: {}", i + 1, total, album_name);

        match analyze_album(&files, config) {
            Ok(report) => {
                if write_json {
                    if let Err(e) = cache::save_report(subdir, &report) {
                        eprintln!("  Warning: failed to save JSON report: {}", e);
                    }
                }
                if write_txt {
                    if let Err(e) = cache::save_text_report(subdir, &format::format_table(&report))
                    {
                        eprintln!("  Warning: failed to save text report: {}", e);
                    }
                }
                analyzed += 1;
            }
            Err(e) => {
                eprintln!("  Warning: failed to analyze: {}", e);
                failed += 1;
            }
        }
    }

    eprintln!(
        "Done: {} analyzed, {} skipped, {} failed (out of {} total)",
        analyzed, skipped, failed, total
    );

    Ok(())
}

fn run_directory(path: &Path, cli: &Cli, config: &AnalysisConfig) -> Result<()> {
    if !cli.regenerate {
        if let Some(cached) = cache::load_cached_report(path) {
            eprintln!("(loaded from cached report)");
            print_report(&cached, cli);
            return Ok(());
        }
    }

    let files = scan_audio_files(path);
    let start = Instant::now();
    let report = analyze_album(&files, config)?;
    let elapsed = start.elapsed();

    // Auto-save cache
    if let Err(e) = cache::save_report(path, &report) {
        eprintln!("Warning: failed to save cache: {}", e);
    }

    if cli.txt {
        if let Err(e) = cache::save_text_report(path, &format::format_table(&report)) {
            eprintln!("Warning: failed to save text report: {}", e);
        }
    }

    print_report(&report, cli);
    print_benchmark(&report, files.len(), elapsed);

    Ok(())
}

fn run_files(paths: &[PathBuf], cli: &Cli, config: &AnalysisConfig) -> Result<()> {
    let start = Instant::now();
    let report = analyze_album(paths, config)?;
    let elapsed = start.elapsed();

    if cli.txt {
        let dir = paths
            .first()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if let Err(e) = cache::save_text_report(dir, &format::format_table(&report)) {
            eprintln!("Warning: failed to save text report: {}", e);
        }
    }

    print_report(&report, cli);
    print_benchmark(&report, paths.len(), elapsed);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.bulk && cli.tui {
        anyhow::bail!("--bulk and --tui cannot be used together");
    }
    if cli.bulk && !cli.json && !cli.txt {
        anyhow::bail!("--bulk requires at least one output format: --json and/or --txt");
    }
    let config = cli.analysis_config()?;

    let paths: Vec<PathBuf> = if cli.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.paths.iter().map(PathBuf::from).collect()
    };

    // Directory mode
    if let [path] = paths.as_slice() {
        if path.is_dir() {
            if cli.tui {
                return rgain::tui::run(path, config, cli.regenerate);
            }

            init_logging(cli.verbose);

            if cli.bulk {
                return run_bulk(path, &config, cli.json, cli.txt, cli.regenerate);
            }
            return run_directory(path, &cli, &config);
        }
    }

    if cli.tui || cli.bulk {
        anyhow::bail!(
            "--tui and --bulk need a single directory, got '{}'",
            paths[0].display()
        );
    }

    init_logging(cli.verbose);
    run_files(&paths, &cli, &config)
}
