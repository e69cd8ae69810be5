//! Print the staged search queries for one title/artist, without any network.
//! Usage: cargo run --bin plan-queries -- "<title>" ["<artist>"] [--candidate "<name>" --candidate-artist "<artist>"]

use anyhow::Result;
use clap::Parser;

use playlist_resolve::models::{ArtistRef, CandidateTrack, SongInfo};
use playlist_resolve::normalize::{
    clean_title, greek_to_greeklish, is_greek, primary_artist, split_artist_parts,
};
use playlist_resolve::query::plan_queries;
use playlist_resolve::scoring::score_breakdown;

#[derive(Parser)]
#[command(name = "plan-queries")]
#[command(about = "Show normalization and the staged query plan for a track")]
struct Args {
    title: String,

    #[arg(default_value = "")]
    artist: String,

    /// Local duration in milliseconds (affects scoring only)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Catalog track name to score against
    #[arg(long)]
    candidate: Option<String>,

    /// Comma-separated credited artists of the candidate
    #[arg(long, default_value = "")]
    candidate_artist: String,

    /// Candidate duration in milliseconds
    #[arg(long, default_value = "0")]
    candidate_duration_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut song = SongInfo::new(args.title.as_str(), args.artist.as_str());
    if let Some(ms) = args.duration_ms {
        song = song.with_duration_ms(ms);
    }

    println!("Title:      {}", song.title);
    println!("Cleaned:    {}", clean_title(&song.title));
    if is_greek(&song.title) || is_greek(&song.artist) {
        println!("Greeklish:  {} / {}", greek_to_greeklish(&song.title), greek_to_greeklish(&song.artist));
    }
    println!("Artist parts: {:?}", split_artist_parts(&song.artist));
    if let Some(primary) = primary_artist(&song.artist) {
        println!("Primary:    {}", primary);
    }

    let plan = plan_queries(&song);
    println!("\n{:-<60}", "");
    for stage in plan.stages() {
        println!("{} ({} queries)", stage.stage, stage.queries.len());
        for query in &stage.queries {
            println!("    {}", query);
        }
    }
    println!("{:-<60}", "");
    println!("Total: {} queries", plan.len());

    if let Some(name) = args.candidate {
        let candidate = CandidateTrack {
            id: String::new(),
            name,
            artists: args
                .candidate_artist
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|a| ArtistRef { name: a.to_string() })
                .collect(),
            duration_ms: args.candidate_duration_ms,
            uri: String::new(),
        };
        let breakdown = score_breakdown(&song, &candidate);
        println!(
            "\nScore vs \"{}\" by \"{}\": {}",
            candidate.name,
            candidate.display_artist(),
            breakdown.summary()
        );
    }

    Ok(())
}
