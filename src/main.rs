use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use playlist_resolve::config::AppConfig;
use playlist_resolve::library::scan_library;
use playlist_resolve::models::{Outcome, ResolutionStats};
use playlist_resolve::playlist::{publish, PublishOutcome, ResolutionReport};
use playlist_resolve::progress::{format_duration, ProgressMode};
use playlist_resolve::search::{RateLimitedSearch, RateLimiter};
use playlist_resolve::spotify::SpotifyClient;
use playlist_resolve::TrackResolver;

#[derive(Parser)]
#[command(name = "playlist-resolve")]
#[command(about = "Create a Spotify playlist from a folder of music")]
struct Args {
    /// Folder to scan recursively for audio files
    folder: PathBuf,

    /// Playlist name (defaults to the folder name)
    #[arg(short, long)]
    name: Option<String>,

    /// Make the playlist private
    #[arg(long)]
    private: bool,

    /// Scan and search, but do not create a playlist
    #[arg(long)]
    dry_run: bool,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// OAuth bearer token for the Spotify Web API
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Files resolved in parallel, 0 = one per CPU (searches share one rate limiter)
    #[arg(long, default_value = "1")]
    jobs: usize,

    /// Cap on search calls per file (overrides config)
    #[arg(long)]
    max_queries: Option<usize>,

    /// Write the per-file resolution report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and log progress at intervals instead
    #[arg(long)]
    log_only: bool,
}

fn playlist_name(args: &Args) -> String {
    args.name.clone().unwrap_or_else(|| {
        args.folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Local Music".to_string())
    })
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(args.config.as_deref())
        .context("Failed to load config")?;
    if let Some(max) = args.max_queries {
        config.resolver.max_queries = Some(max);
    }
    if let Some(token) = &args.token {
        config.access_token = Some(token.clone());
    }
    config
        .resolver
        .validate()
        .context("Invalid resolver settings")?;
    Ok(config)
}

/// Worker pool for resolution. `jobs == 0` sizes it to the CPU count.
fn resolver_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("resolve-{}", i))
        .build()
        .context("Failed to build resolver thread pool")
}

/// Write the optional JSON outputs after publishing. A failed write is logged
/// and skipped; returns whether every requested file was written.
fn write_outputs(
    report_path: Option<&Path>,
    stats_path: Option<&Path>,
    report: &ResolutionReport,
    stats: &ResolutionStats,
) -> bool {
    let mut ok = true;
    if let Some(path) = report_path {
        match report.write_to_file(path) {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write report");
                ok = false;
            }
        }
    }
    if let Some(path) = stats_path {
        if let Err(e) = stats.write_to_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write stats");
            ok = false;
        }
    }
    ok
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let progress = ProgressMode::new(args.log_only);

    let config = load_config(&args)?;
    let Some(token) = config.access_token.clone() else {
        bail!("No Spotify access token: pass --token or set SPOTIFY_ACCESS_TOKEN");
    };

    let pool = resolver_pool(args.jobs)?;

    let start = Instant::now();
    let name = playlist_name(&args);

    if args.dry_run {
        println!("\n=== DRY RUN MODE ===");
        println!("No changes will be made to your Spotify account.\n");
    }

    println!("Scanning folder: {}", args.folder.display());
    let spinner = progress.spinner("Scanning library");
    let songs = scan_library(Path::new(&args.folder), &config.audio_extensions)
        .with_context(|| format!("Failed to scan {}", args.folder.display()))?;
    spinner.finish_and_clear();

    if songs.is_empty() {
        println!("No audio files found in the folder.");
        return Ok(());
    }
    println!("Found {} audio files. Processing...", songs.len());

    let client = SpotifyClient::new(&config.api_base_url, &token);
    let searcher = RateLimitedSearch::new(
        client,
        RateLimiter::from_millis("spotify", config.rate_limit_ms),
    );
    let resolver = TrackResolver::new(searcher, config.resolver.clone());

    let total = songs.len() as u64;
    let pb = progress.bar(total, "Resolving");
    let resolutions: Vec<_> = pool.install(|| {
        songs
            .par_iter()
            .map(|song| {
                let resolution = resolver.resolve(song);
                pb.inc(1);
                progress.checkpoint("resolve", pb.position(), total, 50);
                resolution
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut stats = ResolutionStats::default();
    let mut report = ResolutionReport::new();
    for (song, resolution) in songs.iter().zip(&resolutions) {
        match &resolution.outcome {
            Outcome::Found { result, .. } => println!(
                "✓ Found: {} - {}",
                result.candidate.name,
                result.candidate.display_artist()
            ),
            Outcome::NotFound(_) => println!(
                "✗ Not found: {} - {}",
                song.display_title(),
                song.display_artist()
            ),
        }
        stats.record(resolution);
        report.push(song, resolution);
    }
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    report.print_summary();
    stats.log_phase("resolve");
    println!(
        "Resolved {}/{} files ({:.1}%) with {} searches in {}",
        stats.total_found(),
        stats.total_files,
        stats.match_rate(),
        stats.queries_issued,
        format_duration(start.elapsed())
    );
    let outcome = publish(
        resolver.searcher().inner(),
        &name,
        !args.private,
        &report,
        args.dry_run,
    )
    .with_context(|| format!("Failed to create playlist '{}'", name))?;

    match outcome {
        PublishOutcome::DryRun => println!("\nDry run complete. No playlist created on Spotify."),
        PublishOutcome::NothingToAdd => println!("\nNo tracks found on Spotify to create a playlist."),
        PublishOutcome::Created { tracks, .. } => println!(
            "\nPlaylist '{}' created on Spotify with {} tracks.",
            name, tracks
        ),
    }

    write_outputs(args.report.as_deref(), args.stats.as_deref(), &report, &stats);
    Ok(())
}
